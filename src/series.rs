use crate::domain::Category;

pub fn deltas(cumulative: &[i64]) -> Vec<i64> {
    cumulative
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub cumulative: Vec<i64>,
    pub delta: Vec<i64>,
}

impl SeriesRecord {
    pub fn from_cumulative(cumulative: Vec<i64>) -> Self {
        let delta = deltas(&cumulative);
        Self { cumulative, delta }
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSeries {
    pub infected: SeriesRecord,
    pub recovered: SeriesRecord,
    pub deaths: SeriesRecord,
}

impl RegionSeries {
    pub fn new(infected: Vec<i64>, recovered: Vec<i64>, deaths: Vec<i64>) -> Self {
        Self {
            infected: SeriesRecord::from_cumulative(infected),
            recovered: SeriesRecord::from_cumulative(recovered),
            deaths: SeriesRecord::from_cumulative(deaths),
        }
    }

    pub fn get(&self, category: Category) -> &SeriesRecord {
        match category {
            Category::Infected => &self.infected,
            Category::Recovered => &self.recovered,
            Category::Deaths => &self.deaths,
        }
    }

    pub fn days(&self) -> usize {
        self.infected.len()
    }

    pub fn active(&self) -> Vec<i64> {
        self.infected
            .cumulative
            .iter()
            .zip(&self.recovered.cumulative)
            .zip(&self.deaths.cumulative)
            .map(|((infected, recovered), deaths)| infected - recovered - deaths)
            .collect()
    }

    pub fn active_change_percent(&self) -> Vec<Option<f64>> {
        let active = self.active();
        active
            .windows(2)
            .map(|pair| {
                if pair[1] == 0 {
                    None
                } else {
                    Some((pair[1] - pair[0]) as f64 / pair[1] as f64 * 100.0)
                }
            })
            .collect()
    }
}
