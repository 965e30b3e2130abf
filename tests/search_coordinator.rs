mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{SURVEY, store, taxa};
use fieldref::error::{FieldrefError, Result};
use fieldref::interface::{ProgressListener, SearchCoordinator, search_async};
use fieldref::model::{SearchCriterion, SearchRequest, TaxonOccurrence};

const WAIT: Duration = Duration::from_secs(10);

type Deliveries = Rc<RefCell<Vec<(String, Result<Vec<TaxonOccurrence>>)>>>;

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);
impl ProgressListener for Recorder {
    fn shown(&mut self, field: &str) {
        self.0.borrow_mut().push(format!("shown {field}"));
    }
    fn dismissed(&mut self, field: &str) {
        self.0.borrow_mut().push(format!("dismissed {field}"));
    }
}

fn request(field: &str, criterion: &str, text: &str) -> SearchRequest {
    SearchRequest::new(field, SearchCriterion::from(criterion), SURVEY, "trees", text, 100)
}

fn collect(deliveries: Deliveries) -> impl FnOnce(&str, Result<Vec<TaxonOccurrence>>) + 'static {
    move |field: &str, outcome: Result<Vec<TaxonOccurrence>>| deliveries.borrow_mut().push((field.to_owned(), outcome))
}

#[test]
fn results_arrive_through_the_dispatcher() {
    let store = store();
    taxa(&store);
    let progress = Recorder::default();
    let mut coordinator = SearchCoordinator::new(store).with_progress(Box::new(progress.clone()));
    let deliveries = Deliveries::default();

    let ticket = coordinator.start_search(request("species", "code", "OAK"), collect(Rc::clone(&deliveries)));
    assert_eq!(ticket.field, "species");
    assert!(coordinator.is_searching("species"));
    assert!(deliveries.borrow().is_empty(), "nothing is delivered before dispatching");

    assert_eq!(coordinator.dispatch_until_idle(WAIT), 1);
    assert!(!coordinator.is_searching("species"));
    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "species");
    assert_eq!(deliveries[0].1.as_ref().expect("results").len(), 2);
    assert_eq!(*progress.0.borrow(), vec!["shown species", "dismissed species"]);
}

#[test]
fn a_newer_search_supersedes_the_older_one() {
    let store = store();
    taxa(&store);
    let progress = Recorder::default();
    let mut coordinator = SearchCoordinator::new(store).with_progress(Box::new(progress.clone()));
    let deliveries = Deliveries::default();

    coordinator.start_search(request("species", "code", "OAK"), collect(Rc::clone(&deliveries)));
    coordinator.start_search(request("species", "code", "PIN"), collect(Rc::clone(&deliveries)));
    assert_eq!(coordinator.in_flight(), 1);

    assert_eq!(coordinator.dispatch_until_idle(WAIT), 1);
    // give a slow first worker the chance to post, it must still be ignored
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(coordinator.dispatch_pending(), 0);

    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1);
    let found = deliveries[0].1.as_ref().expect("results");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, "PIN/SY");
    assert_eq!(
        *progress.0.borrow(),
        vec!["shown species", "dismissed species", "shown species", "dismissed species"]
    );
}

#[test]
fn fields_are_independent() {
    let store = store();
    taxa(&store);
    let mut coordinator = SearchCoordinator::new(store);
    let deliveries = Deliveries::default();

    coordinator.start_search(request("tree", "code", "OAK"), collect(Rc::clone(&deliveries)));
    coordinator.start_search(request("shrub", "scientific_name", "Fagus"), collect(Rc::clone(&deliveries)));
    assert_eq!(coordinator.in_flight(), 2);
    assert_eq!(coordinator.dispatch_until_idle(WAIT), 2);

    let mut fields: Vec<String> = deliveries.borrow().iter().map(|(f, _)| f.clone()).collect();
    fields.sort();
    assert_eq!(fields, vec!["shrub", "tree"]);
}

#[test]
fn cancelled_searches_never_call_back() {
    let store = store();
    taxa(&store);
    let progress = Recorder::default();
    let mut coordinator = SearchCoordinator::new(store).with_progress(Box::new(progress.clone()));
    let deliveries = Deliveries::default();

    coordinator.start_search(request("species", "code", "OAK"), collect(Rc::clone(&deliveries)));
    assert!(coordinator.cancel("species"));
    assert!(!coordinator.cancel("species"), "nothing left to cancel");

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(coordinator.dispatch_pending(), 0);
    assert!(!coordinator.dispatch_next(Duration::from_millis(10)));
    assert!(deliveries.borrow().is_empty());
    assert_eq!(*progress.0.borrow(), vec!["shown species", "dismissed species"]);
}

#[test]
fn failures_are_delivered_as_typed_errors() {
    let store = store();
    taxa(&store);
    let progress = Recorder::default();
    let mut coordinator = SearchCoordinator::new(store).with_progress(Box::new(progress.clone()));
    let deliveries = Deliveries::default();

    coordinator.start_search(request("species", "family", "Fag"), collect(Rc::clone(&deliveries)));
    assert_eq!(coordinator.dispatch_until_idle(WAIT), 1);
    let deliveries = deliveries.borrow();
    assert!(matches!(
        deliveries[0].1,
        Err(FieldrefError::UnsupportedCriterion(_))
    ));
    assert_eq!(*progress.0.borrow(), vec!["shown species", "dismissed species"]);
}

#[test]
fn expired_searches_report_a_timeout() {
    let store = store();
    taxa(&store);
    let mut coordinator = SearchCoordinator::new(store).with_timeout(Some(Duration::ZERO));
    let deliveries = Deliveries::default();

    coordinator.start_search(request("species", "code", "OAK"), collect(Rc::clone(&deliveries)));
    assert_eq!(coordinator.dispatch_until_idle(WAIT), 1);
    assert!(matches!(
        deliveries.borrow()[0].1,
        Err(FieldrefError::QueryTimeout { .. })
    ));
}

#[test]
fn unavailable_store_is_delivered_as_an_error() {
    let store = fieldref::persist::Store::open("/nonexistent/dir/reference.db");
    let mut coordinator = SearchCoordinator::new(store);
    let deliveries = Deliveries::default();

    coordinator.start_search(request("species", "code", "OAK"), collect(Rc::clone(&deliveries)));
    assert_eq!(coordinator.dispatch_until_idle(WAIT), 1);
    assert!(matches!(
        deliveries.borrow()[0].1,
        Err(FieldrefError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn future_based_search() {
    let store = store();
    taxa(&store);
    let found = search_async(store.clone(), request("species", "vernacular_name", "Scots"), None)
        .await
        .expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].scientific_name, "Pinus sylvestris");

    let expired = search_async(store, request("species", "code", "OAK"), Some(Duration::ZERO)).await;
    assert!(matches!(expired, Err(FieldrefError::QueryTimeout { .. })));
}
