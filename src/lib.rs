//! Crowdsourced facility temperature dashboard.
//!
//! The heart of the crate is [`aggregator::Aggregator`], which turns
//! visitor-submitted, visitor-voted readings into one trusted temperature per
//! facility. Storage sits behind the traits in [`store`]; the services build
//! display views, seed data and a drift simulation on top.

pub mod models {
    pub mod facility;
    pub mod feedback;
    pub mod reading;
}

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod db {
    pub mod models;
}
pub mod schema;
pub mod store;
pub mod units;
pub mod services {
    pub mod dashboard;
    pub mod seed;
    pub mod simulate;
}
