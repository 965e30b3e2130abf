#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use fieldref::model::{CodeList, ModelVersion, Survey};
use fieldref::persist::Store;
use rusqlite::params;

pub const SURVEY: i64 = 1;
pub const LAND_USE: i64 = 10;

pub fn store() -> Store {
    let store = Store::in_memory().expect("store");
    store.create_schema().expect("schema");
    store
}

pub fn survey(languages: &[&str]) -> Arc<Survey> {
    Arc::new(Survey::new(
        SURVEY,
        false,
        languages.iter().map(|l| l.to_string()).collect(),
    ))
}

pub fn versions() -> Vec<ModelVersion> {
    vec![
        ModelVersion::new(100, "2019", NaiveDate::from_ymd_opt(2019, 1, 1)),
        ModelVersion::new(200, "2021", NaiveDate::from_ymd_opt(2021, 1, 1)),
        ModelVersion::new(300, "2023", NaiveDate::from_ymd_opt(2023, 1, 1)),
    ]
}

pub fn land_use(survey: Arc<Survey>) -> CodeList {
    CodeList::new(LAND_USE, "land_use", survey)
}

/// A code list row with the columns tests usually care about.
pub struct ItemRow<'a> {
    pub id: i64,
    pub parent: Option<i64>,
    pub code: &'a str,
    pub sort_order: i64,
    pub labels: [Option<&'a str>; 3],
}

pub fn add_item(store: &Store, item: ItemRow) {
    store
        .acquire_writer()
        .expect("writer")
        .execute(
            "insert into ofc_code_list (
                id, survey_id, code_list_id, parent_id, code, sort_order, label1, label2, label3
            ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.id,
                SURVEY,
                LAND_USE,
                item.parent,
                item.code,
                item.sort_order,
                item.labels[0],
                item.labels[1],
                item.labels[2]
            ],
        )
        .expect("insert item");
}

pub fn execute(store: &Store, sql: &str) {
    store.acquire_writer().expect("writer").execute_batch(sql).expect("sql");
}

/// Two taxonomies in the same survey, plus one in another survey, so that
/// scoping can be checked.
pub fn taxa(store: &Store) {
    execute(
        store,
        "
        insert into ofc_taxonomy (id, survey_id, name) values
            (1, 1, 'trees'), (2, 1, 'birds'), (3, 2, 'trees');
        insert into ofc_taxon (id, taxonomy_id, code, scientific_name) values
            (1, 1, 'OAK/RO', 'Quercus robur'),
            (2, 1, 'OAK/PE', 'Quercus petraea'),
            (3, 1, 'PIN/SY', 'Pinus sylvestris'),
            (4, 1, 'FAG/SY', 'Fagus sylvatica'),
            (5, 1, 'ACE_PS', 'Acer pseudoplatanus'),
            (6, 2, 'OAK/TI', 'Baeolophus inornatus'),
            (7, 3, 'OAK/XX', 'Quercus alba');
        insert into ofc_taxon_vernacular_name
            (id, taxon_id, vernacular_name, language_code, language_variety) values
            (1, 1, 'English oak', 'en', null),
            (2, 1, 'Stieleiche', 'de', null),
            (3, 2, 'Sessile oak', 'en', 'GB'),
            (4, 3, 'Scots pine', 'en', null),
            (5, 6, 'Oak titmouse', 'en', null),
            (6, 7, 'White oak', 'en', null);
        ",
    );
}
