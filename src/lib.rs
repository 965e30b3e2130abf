//! Fieldref – offline reference-data lookups for field data collection.
//!
//! Field surveys constrain many inputs to controlled vocabularies and to
//! taxonomic reference data. Both are mirrored into a local SQLite database so
//! that they can be browsed and searched with no network at hand. This crate
//! is the query side of that mirror:
//! * [`codelist`] – loads hierarchical code lists one level at a time, scoped
//!   by survey, list and model version, with labels resolved per language.
//! * [`label`] – maps the stored label columns onto the survey languages.
//! * [`taxon`] – looks taxa up by code, scientific name or vernacular name.
//! * [`interface`] – runs taxon searches off the interactive thread and hands
//!   the results back through a channel, one live search per input field.
//! * [`persist`] – the owned [`persist::Store`] handle and the mirror schema.
//! * [`model`] – the plain records produced by the queries.
//! * [`settings`] – configuration read with the `config` crate.
//!
//! ## Connections
//! A [`persist::Store`] is passed in explicitly. Every logical operation
//! acquires its own connection and drops it when done; a store handle is never
//! shared between concurrently running queries.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use fieldref::{codelist::CodeListLoader, model::{CodeList, Survey}, persist::Store};
//! let store = Store::in_memory().unwrap();
//! store.create_schema().unwrap();
//! let survey = Arc::new(Survey::new(1, false, vec!["en".to_string()]));
//! let land_use = CodeList::new(7, "land_use", survey);
//! let roots = CodeListLoader::new(store).load_root_items(&land_use, None).unwrap();
//! assert!(roots.is_empty());
//! ```

pub mod codelist;
pub mod error;
pub mod interface;
pub mod label;
pub mod model;
pub mod persist;
pub mod settings;
pub mod taxon;
