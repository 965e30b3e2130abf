use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use fieldref::codelist::CodeListLoader;
use fieldref::label::resolve_labels;
use fieldref::model::{CodeList, Survey};
use fieldref::persist::Store;
use fieldref::taxon::TaxonSearch;
use rusqlite::params;

const TAXA: i64 = 20_000;
const ITEMS_PER_LEVEL: i64 = 200;

fn populated_store() -> Store {
    let store = Store::in_memory().unwrap();
    store.create_schema().unwrap();
    let mut db = store.acquire_writer().unwrap();
    let tx = db.transaction().unwrap();
    tx.execute("insert into ofc_taxonomy (id, survey_id, name) values (1, 1, 'trees')", [])
        .unwrap();
    {
        let mut taxon = tx
            .prepare("insert into ofc_taxon (id, taxonomy_id, code, scientific_name) values (?, 1, ?, ?)")
            .unwrap();
        let mut vernacular = tx
            .prepare(
                "insert into ofc_taxon_vernacular_name (id, taxon_id, vernacular_name, language_code) values (?, ?, ?, 'en')",
            )
            .unwrap();
        for i in 0..TAXA {
            taxon
                .execute(params![i, format!("T{:05}", i), format!("Genus{} species{}", i % 97, i)])
                .unwrap();
            vernacular
                .execute(params![i, i, format!("Common {} tree", i % 113)])
                .unwrap();
        }
        let mut item = tx
            .prepare(
                "insert into ofc_code_list (id, survey_id, code_list_id, parent_id, code, sort_order, label1, label2)
                    values (?, 1, 1, ?, ?, ?, ?, ?)",
            )
            .unwrap();
        for i in 0..ITEMS_PER_LEVEL {
            item.execute(params![i, None::<i64>, format!("R{i}"), ITEMS_PER_LEVEL - i, format!("Root {i}"), format!("Racine {i}")])
                .unwrap();
        }
    }
    tx.commit().unwrap();
    store
}

fn criterion_benchmark(c: &mut Criterion) {
    let store = populated_store();

    let columns = [Some("Forest".to_string()), Some("Forêt".to_string()), None];
    let languages = ["en", "fr", "es"];
    c.bench_function("resolve labels", |b| {
        b.iter(|| resolve_labels(black_box(&columns), black_box(&languages)))
    });

    let survey = Arc::new(Survey::new(1, false, vec!["en".into(), "fr".into()]));
    let list = CodeList::new(1, "bench", survey);
    let loader = CodeListLoader::new(store.clone());
    let session = loader.session().unwrap();
    c.bench_function("load root level", |b| {
        b.iter(|| session.load_root_items(black_box(&list), None).unwrap())
    });

    let search = TaxonSearch::open(&store).unwrap();
    c.bench_function("search by code", |b| {
        b.iter(|| search.search_by_code(1, "trees", black_box("T1"), 50).unwrap())
    });
    c.bench_function("search by scientific name", |b| {
        b.iter(|| search.search_by_scientific_name(1, "trees", black_box("Genus4"), 50).unwrap())
    });
    c.bench_function("search by vernacular name", |b| {
        b.iter(|| search.search_by_vernacular_name(1, "trees", black_box("Common 1"), 50).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
