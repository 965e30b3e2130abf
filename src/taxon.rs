//! Taxon lookups by code, scientific name or vernacular name.
//!
//! All three strategies use SQLite's `LIKE` as a prefix match, which compares
//! ASCII letters case-insensitively. Results are capped by the caller's
//! maximum and ordered by the searched column, then by taxon identity, so the
//! same input always yields the same sequence.

use rusqlite::{Connection, Row, params};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{FieldrefError, Result};
use crate::model::{Identifier, SearchCriterion, SearchRequest, TaxonOccurrence};
use crate::persist::{QueryGuard, Store};

const BY_CODE: &str = r"
    select t.id, t.code, t.scientific_name
        from ofc_taxon t
        join ofc_taxonomy tx
        on tx.id = t.taxonomy_id
        where tx.survey_id = ?1
        and tx.name = ?2
        and t.code like ?3 escape '\'
        order by t.code, t.id
        limit ?4
";
const BY_SCIENTIFIC_NAME: &str = r"
    select t.id, t.code, t.scientific_name
        from ofc_taxon t
        join ofc_taxonomy tx
        on tx.id = t.taxonomy_id
        where tx.survey_id = ?1
        and tx.name = ?2
        and t.scientific_name like ?3 escape '\'
        order by t.scientific_name, t.id
        limit ?4
";
const BY_VERNACULAR_NAME: &str = r"
    select t.id, t.code, t.scientific_name,
            v.vernacular_name, v.language_code, v.language_variety
        from ofc_taxon_vernacular_name v
        join ofc_taxon t
        on t.id = v.taxon_id
        join ofc_taxonomy tx
        on tx.id = t.taxonomy_id
        where tx.survey_id = ?1
        and tx.name = ?2
        and v.vernacular_name like ?3 escape '\'
        order by v.vernacular_name, t.id, v.id
        limit ?4
";

/// Turns user text into a prefix pattern, escaping the `LIKE` wildcards so
/// they match literally.
pub fn prefix_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 1);
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ------------- TaxonSearch -------------
pub struct TaxonSearch {
    db: Connection,
    guard: Option<QueryGuard>,
}
impl TaxonSearch {
    pub fn open(store: &Store) -> Result<Self> {
        Ok(Self {
            db: store.acquire()?,
            guard: None,
        })
    }
    /// Opens a search whose queries stop when the guard is cancelled or its
    /// deadline expires.
    pub fn open_guarded(store: &Store, guard: QueryGuard) -> Result<Self> {
        Ok(Self {
            db: store.acquire_guarded(&guard)?,
            guard: Some(guard),
        })
    }

    /// Runs the strategy named by the request's criterion.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<TaxonOccurrence>> {
        let started = Instant::now();
        let found = match &request.criterion {
            SearchCriterion::Code => self.search_by_code(
                request.survey,
                &request.taxonomy,
                &request.text,
                request.max_results,
            ),
            SearchCriterion::ScientificName => self.search_by_scientific_name(
                request.survey,
                &request.taxonomy,
                &request.text,
                request.max_results,
            ),
            SearchCriterion::VernacularName => self.search_by_vernacular_name(
                request.survey,
                &request.taxonomy,
                &request.text,
                request.max_results,
            ),
            SearchCriterion::Other(name) => {
                warn!(field = %request.field, criterion = %name, "unsupported search criterion");
                Err(FieldrefError::UnsupportedCriterion(name.clone()))
            }
        }?;
        info!(
            field = %request.field,
            criterion = %request.criterion,
            rows = found.len(),
            ms = started.elapsed().as_secs_f64() * 1000.0,
            "taxon search complete"
        );
        Ok(found)
    }
    pub fn search_by_code(
        &self,
        survey: Identifier,
        taxonomy: &str,
        text: &str,
        max_results: u32,
    ) -> Result<Vec<TaxonOccurrence>> {
        self.run(BY_CODE, survey, taxonomy, text, max_results, taxon_from_row)
    }
    pub fn search_by_scientific_name(
        &self,
        survey: Identifier,
        taxonomy: &str,
        text: &str,
        max_results: u32,
    ) -> Result<Vec<TaxonOccurrence>> {
        self.run(BY_SCIENTIFIC_NAME, survey, taxonomy, text, max_results, taxon_from_row)
    }
    pub fn search_by_vernacular_name(
        &self,
        survey: Identifier,
        taxonomy: &str,
        text: &str,
        max_results: u32,
    ) -> Result<Vec<TaxonOccurrence>> {
        self.run(
            BY_VERNACULAR_NAME,
            survey,
            taxonomy,
            text,
            max_results,
            vernacular_from_row,
        )
    }

    fn run(
        &self,
        sql: &str,
        survey: Identifier,
        taxonomy: &str,
        text: &str,
        max_results: u32,
        map: fn(&Row) -> rusqlite::Result<TaxonOccurrence>,
    ) -> Result<Vec<TaxonOccurrence>> {
        let text = text.trim();
        if text.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }
        if let Some(guard) = &self.guard {
            guard.check()?;
        }
        let pattern = prefix_pattern(text);
        debug!(survey, taxonomy, %pattern, max_results, "taxon query");
        let mut statement = self.db.prepare_cached(sql).map_err(|e| self.fail(e))?;
        let rows = statement
            .query_map(params![survey, taxonomy, pattern, max_results], map)
            .map_err(|e| self.fail(e))?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row.map_err(|e| self.fail(e))?);
        }
        Ok(found)
    }
    fn fail(&self, error: rusqlite::Error) -> FieldrefError {
        match &self.guard {
            Some(guard) => guard.interpret(error),
            None => error.into(),
        }
    }
}

fn taxon_from_row(row: &Row) -> rusqlite::Result<TaxonOccurrence> {
    Ok(TaxonOccurrence {
        taxon_id: row.get(0)?,
        code: row.get(1)?,
        scientific_name: row.get(2)?,
        vernacular_name: None,
        language_code: None,
        language_variety: None,
    })
}

fn vernacular_from_row(row: &Row) -> rusqlite::Result<TaxonOccurrence> {
    Ok(TaxonOccurrence {
        taxon_id: row.get(0)?,
        code: row.get(1)?,
        scientific_name: row.get(2)?,
        vernacular_name: row.get(3)?,
        language_code: row.get(4)?,
        language_variety: row.get(5)?,
    })
}
