//! Wall-clock access for season detection.

use std::sync::Mutex;

use chrono::{Local, NaiveDate};

use crate::models::Season;

/// Source of "today".
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    /// Current calendar year and season.
    fn current_season(&self) -> (i32, Season) {
        Season::current(&self.today())
    }
}

/// Local system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to a date that can be moved by hand.
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(|e| e.into_inner())
    }
}
