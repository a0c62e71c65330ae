use std::fmt;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Infected,
    Recovered,
    Deaths,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Infected, Category::Recovered, Category::Deaths];

    pub fn file_name(self) -> &'static str {
        match self {
            Category::Infected => "time_series_covid19_confirmed_global.csv",
            Category::Recovered => "time_series_covid19_recovered_global.csv",
            Category::Deaths => "time_series_covid19_deaths_global.csv",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Infected => "infected",
            Category::Recovered => "recovered",
            Category::Deaths => "deaths",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChartMode {
    #[default]
    Stacked,
    Infected,
    Recovered,
    Deaths,
}

impl ChartMode {
    pub fn single_category(self) -> Option<Category> {
        match self {
            ChartMode::Stacked => None,
            ChartMode::Infected => Some(Category::Infected),
            ChartMode::Recovered => Some(Category::Recovered),
            ChartMode::Deaths => Some(Category::Deaths),
        }
    }
}

impl fmt::Display for ChartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartMode::Stacked => write!(f, "stacked"),
            ChartMode::Infected => write!(f, "infected"),
            ChartMode::Recovered => write!(f, "recovered"),
            ChartMode::Deaths => write!(f, "deaths"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub state: String,
    pub country: String,
}

impl RegionKey {
    pub fn new(state: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            country: country.into(),
        }
    }

    pub fn matches(&self, state: &str, country: &str) -> bool {
        self.state == state && self.country == country
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.state.is_empty() {
            write!(f, "{}", self.country)
        } else {
            write!(f, "{}; {}", self.state, self.country)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Missing,
    Stale,
    Forced,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshReason::Missing => write!(f, "missing"),
            RefreshReason::Stale => write!(f, "outdated"),
            RefreshReason::Forced => write!(f, "forced by user"),
        }
    }
}
