//! Loads code-list hierarchies one level at a time.
//!
//! Every call selects the items of a single level (the roots of a list, or
//! the children of one item) in sort order and resolves their labels against
//! the survey languages. Walking the tree is left to the caller, which asks
//! for the next level when a node is expanded.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};

use crate::error::{FieldrefError, Result};
use crate::label::resolve_labels;
use crate::model::{CodeList, CodeListItem, Identifier, ModelVersion, Survey};
use crate::persist::Store;

const ITEM_COLUMNS: &str = "
    id, code_list_id, parent_id, code, qualifiable, sort_order,
    since_version_id, deprecated_version_id,
    label1, label2, label3,
    description1, description2, description3";

/// The column that scopes stored items to a survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeColumn {
    Published,
    Work,
}
impl ScopeColumn {
    pub fn of(survey: &Survey) -> Self {
        if survey.work { Self::Work } else { Self::Published }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "survey_id",
            Self::Work => "survey_work_id",
        }
    }
}

// ------------- CodeListLoader -------------
/// Entry point for tree loading. Each call acquires its own connection and
/// releases it before returning; use [`CodeListLoader::session`] to run a
/// batch of calls over one connection.
#[derive(Clone, Debug)]
pub struct CodeListLoader {
    store: Store,
    version_filter: bool,
}
impl CodeListLoader {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            version_filter: false,
        }
    }
    /// Drops items that are not yet introduced, or already deprecated, in the
    /// version passed to the load calls.
    pub fn with_version_filter(mut self, enabled: bool) -> Self {
        self.version_filter = enabled;
        self
    }
    pub fn session(&self) -> Result<CodeListSession> {
        Ok(CodeListSession {
            db: self.store.acquire()?,
            version_filter: self.version_filter,
        })
    }
    pub fn load_root_items(
        &self,
        code_list: &CodeList,
        version: Option<&ModelVersion>,
    ) -> Result<Vec<CodeListItem>> {
        self.session()?.load_root_items(code_list, version)
    }
    pub fn load_child_items(
        &self,
        code_list: &CodeList,
        parent: Option<Identifier>,
        version: Option<&ModelVersion>,
    ) -> Result<Vec<CodeListItem>> {
        self.session()?.load_child_items(code_list, parent, version)
    }
    pub fn load_item(&self, code_list: &CodeList, item: Identifier) -> Result<Option<CodeListItem>> {
        self.session()?.load_item(code_list, item)
    }
    pub fn load_item_by_code(
        &self,
        code_list: &CodeList,
        parent: Option<Identifier>,
        code: &str,
    ) -> Result<Option<CodeListItem>> {
        self.session()?.load_item_by_code(code_list, parent, code)
    }
    pub fn has_child_items(&self, code_list: &CodeList, parent: Option<Identifier>) -> Result<bool> {
        self.session()?.has_child_items(code_list, parent)
    }
}

// ------------- CodeListSession -------------
/// A borrowed-for-a-batch connection. Dropping the session releases it.
pub struct CodeListSession {
    db: Connection,
    version_filter: bool,
}
impl CodeListSession {
    pub fn load_root_items(
        &self,
        code_list: &CodeList,
        version: Option<&ModelVersion>,
    ) -> Result<Vec<CodeListItem>> {
        self.load_children(code_list, None, version)
    }
    pub fn load_child_items(
        &self,
        code_list: &CodeList,
        parent: Option<Identifier>,
        version: Option<&ModelVersion>,
    ) -> Result<Vec<CodeListItem>> {
        self.load_children(code_list, parent, version)
    }
    /// Loads one level of the hierarchy: the children of `parent`, or the
    /// roots of the list when no parent is given.
    pub fn load_children(
        &self,
        code_list: &CodeList,
        parent: Option<Identifier>,
        version: Option<&ModelVersion>,
    ) -> Result<Vec<CodeListItem>> {
        let survey = &code_list.survey;
        // `is` matches a null parameter against null parents
        let sql = format!(
            "select {} from ofc_code_list
                where {} = ?1
                and code_list_id = ?2
                and parent_id is ?3
                order by sort_order, id",
            ITEM_COLUMNS,
            ScopeColumn::of(survey).as_str()
        );
        let mut statement = self.db.prepare_cached(&sql)?;
        let mut rows = statement.query(params![survey.id, code_list.id, parent])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let item = item_from_row(row, survey)?;
            if self.applicable(survey, &item, version) {
                items.push(item);
            }
        }
        debug!(
            code_list = code_list.id,
            parent = ?parent,
            items = items.len(),
            "code list level loaded"
        );
        Ok(items)
    }
    pub fn load_item(&self, code_list: &CodeList, item: Identifier) -> Result<Option<CodeListItem>> {
        let survey = &code_list.survey;
        let sql = format!(
            "select {} from ofc_code_list
                where {} = ?1
                and code_list_id = ?2
                and id = ?3",
            ITEM_COLUMNS,
            ScopeColumn::of(survey).as_str()
        );
        let mut statement = self.db.prepare_cached(&sql)?;
        let mut rows = statement.query(params![survey.id, code_list.id, item])?;
        match rows.next()? {
            Some(row) => Ok(Some(item_from_row(row, survey)?)),
            None => Ok(None),
        }
    }
    pub fn load_item_by_code(
        &self,
        code_list: &CodeList,
        parent: Option<Identifier>,
        code: &str,
    ) -> Result<Option<CodeListItem>> {
        let survey = &code_list.survey;
        let sql = format!(
            "select {} from ofc_code_list
                where {} = ?1
                and code_list_id = ?2
                and parent_id is ?3
                and code = ?4",
            ITEM_COLUMNS,
            ScopeColumn::of(survey).as_str()
        );
        let mut statement = self.db.prepare_cached(&sql)?;
        let mut rows = statement.query(params![survey.id, code_list.id, parent, code])?;
        match rows.next()? {
            Some(row) => Ok(Some(item_from_row(row, survey)?)),
            None => Ok(None),
        }
    }
    pub fn has_child_items(&self, code_list: &CodeList, parent: Option<Identifier>) -> Result<bool> {
        let survey = &code_list.survey;
        let sql = format!(
            "select 1 from ofc_code_list
                where {} = ?1
                and code_list_id = ?2
                and parent_id is ?3
                limit 1",
            ScopeColumn::of(survey).as_str()
        );
        let found = self
            .db
            .prepare_cached(&sql)?
            .query_row(params![survey.id, code_list.id, parent], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn applicable(&self, survey: &Survey, item: &CodeListItem, version: Option<&ModelVersion>) -> bool {
        let Some(version) = version.filter(|_| self.version_filter) else {
            return true;
        };
        let Some(current) = survey.version_rank(version.id) else {
            debug!(version = version.id, "version not declared by survey, skipping filter");
            return true;
        };
        let introduced = item
            .since_version()
            .and_then(|since| survey.version_rank(since))
            .is_none_or(|since| since <= current);
        let retired = item
            .deprecated_version()
            .and_then(|deprecated| survey.version_rank(deprecated))
            .is_some_and(|deprecated| deprecated <= current);
        introduced && !retired
    }
}

fn item_from_row(row: &Row, survey: &Survey) -> Result<CodeListItem> {
    let id: Identifier = row.get("id")?;
    let code: String = row
        .get::<_, Option<String>>("code")?
        .ok_or_else(|| FieldrefError::MalformedRow {
            row: Some(id),
            message: "missing code".to_owned(),
        })?;
    let mut item = CodeListItem::new(id, row.get("code_list_id")?, code);
    item.set_qualifiable(row.get::<_, Option<bool>>("qualifiable")?.unwrap_or(false));
    item.set_sort_order(row.get::<_, Option<i64>>("sort_order")?.unwrap_or(0));
    item.set_parent(row.get("parent_id")?);
    item.set_versions(row.get("since_version_id")?, row.get("deprecated_version_id")?);
    let labels = [
        row.get::<_, Option<String>>("label1")?,
        row.get::<_, Option<String>>("label2")?,
        row.get::<_, Option<String>>("label3")?,
    ];
    let descriptions = [
        row.get::<_, Option<String>>("description1")?,
        row.get::<_, Option<String>>("description2")?,
        row.get::<_, Option<String>>("description3")?,
    ];
    item.set_labels(resolve_labels(&labels, &survey.languages));
    item.set_descriptions(resolve_labels(&descriptions, &survey.languages));
    if labels[0].as_deref().is_none_or(str::is_empty) {
        warn!(
            item = id,
            code = item.code(),
            language = ?survey.default_language(),
            "code list item has no label in the default language"
        );
    }
    Ok(item)
}
