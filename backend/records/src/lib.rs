//! # Portal Records
//!
//! Documents behind the hackathon portal and the rules for changing them.
//!
//! ## Collections
//! - `portal:users`: user profiles with skills
//! - `portal:organizations`: organizations that host hackathons
//! - `portal:hackathons`: hackathons with embedded participant records
//! - `portal:teams`: teams with their workspace, submission, and scores
//! - `portal:credentials`: IDE login id to owner index
//! - `portal:sessions`: open IDE sessions by bearer token
//!
//! Every operation takes the current time as an argument so rules around deadlines
//! can be tested without a clock.
pub mod activity;
pub mod credentials;
pub mod database;
pub mod error;
pub mod hackathon;
pub mod judging;
pub mod language;
pub mod matching;
pub mod memory;
pub mod store;
pub mod team;
pub mod user;
pub mod utils;
pub mod workspace;

pub use error::{RecordError, RecordResult, StoreError};
pub use store::{Collection, Document, DocumentStore, Documents};
