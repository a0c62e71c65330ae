use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::domain::RegionKey;
use crate::error::CovidError;

const STATE_COLUMN: usize = 0;
const COUNTRY_COLUMN: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub start_column: usize,
    pub columns: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl TableSchema {
    pub fn from_headers(
        headers: &StringRecord,
        start_date: NaiveDate,
        source_name: &str,
    ) -> Result<Self, CovidError> {
        let start_column = headers
            .iter()
            .position(|header| parse_header_date(header) == Some(start_date))
            .ok_or_else(|| CovidError::MissingStartDate {
                date: start_date.to_string(),
                file: source_name.to_string(),
            })?;

        let last_date = headers
            .iter()
            .skip(start_column)
            .filter_map(parse_header_date)
            .last()
            .unwrap_or(start_date);

        Ok(Self {
            start_column,
            columns: headers.len(),
            first_date: start_date,
            last_date,
        })
    }

    pub fn days(&self) -> usize {
        self.columns - self.start_column
    }
}

pub fn parse_header_date(header: &str) -> Option<NaiveDate> {
    let header = header.trim();
    NaiveDate::parse_from_str(header, "%m/%d/%y")
        .or_else(|_| NaiveDate::parse_from_str(header, "%Y-%m-%d"))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    pub fields: Vec<String>,
    pub cumulative: Vec<i64>,
    pub schema: TableSchema,
}

pub fn extract_series<R: Read>(
    reader: R,
    key: &RegionKey,
    start_date: NaiveDate,
    source_name: &str,
) -> Result<ExtractedRow, CovidError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|err| csv_error(source_name, err))?
        .clone();
    let schema = TableSchema::from_headers(&headers, start_date, source_name)?;
    debug!(
        file = source_name,
        start_column = schema.start_column,
        days = schema.days(),
        "resolved table schema"
    );

    for result in reader.records() {
        let record = result.map_err(|err| csv_error(source_name, err))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if record.len() <= COUNTRY_COLUMN {
            return Err(CovidError::MalformedRow {
                file: source_name.to_string(),
                line,
                expected: schema.columns,
                found: record.len(),
            });
        }
        if !key.matches(&record[STATE_COLUMN], &record[COUNTRY_COLUMN]) {
            continue;
        }
        if record.len() < schema.columns {
            return Err(CovidError::MalformedRow {
                file: source_name.to_string(),
                line,
                expected: schema.columns,
                found: record.len(),
            });
        }

        let cumulative = record
            .iter()
            .enumerate()
            .skip(schema.start_column)
            .take(schema.days())
            .map(|(column, value)| {
                parse_count(value).ok_or_else(|| CovidError::InvalidValue {
                    file: source_name.to_string(),
                    line,
                    column,
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<_>, CovidError>>()?;

        debug!(file = source_name, line, region = %key, "matched region row");
        return Ok(ExtractedRow {
            fields: record.iter().map(str::to_string).collect(),
            cumulative,
            schema,
        });
    }

    Err(CovidError::RegionNotFound {
        state: key.state.clone(),
        country: key.country.clone(),
        file: source_name.to_string(),
    })
}

pub fn list_regions<R: Read>(reader: R, source_name: &str) -> Result<Vec<RegionKey>, CovidError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut regions = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| csv_error(source_name, err))?;
        if record.len() <= COUNTRY_COLUMN {
            return Err(CovidError::MalformedRow {
                file: source_name.to_string(),
                line: record.position().map(|pos| pos.line()).unwrap_or(0),
                expected: COUNTRY_COLUMN + 1,
                found: record.len(),
            });
        }
        regions.push(RegionKey::new(
            &record[STATE_COLUMN],
            &record[COUNTRY_COLUMN],
        ));
    }
    Ok(regions)
}

// Some upstream revisions wrote counts as `123.0`.
fn parse_count(value: &str) -> Option<i64> {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.strip_suffix(".0").and_then(|v| v.parse::<i64>().ok()))
}

fn csv_error(source_name: &str, err: csv::Error) -> CovidError {
    CovidError::Csv {
        file: source_name.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
Province/State,Country/Region,Lat,Long,2/28/20,2/29/20,3/1/20,3/2/20,3/3/20
,Testland,1.0,2.0,1,2,3,5,8
Prov1,Testland,1.0,2.0,0,0,1,1,2
\"Bonaire, Sint Eustatius and Saba\",Netherlands,0,0,0,0,0,0,4
";

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
    }

    #[test]
    fn schema_from_header_dates() {
        let headers = StringRecord::from(vec!["Province/State", "Country/Region", "1/22/20", "3/1/20", "3/2/20"]);
        let schema = TableSchema::from_headers(&headers, start(), "fixture").unwrap();
        assert_eq!(schema.start_column, 3);
        assert_eq!(schema.days(), 2);
        assert_eq!(schema.last_date, NaiveDate::from_ymd_opt(2020, 3, 2).unwrap());
    }

    #[test]
    fn extracts_suffix_from_start_date() {
        let key = RegionKey::new("", "Testland");
        let row = extract_series(FIXTURE.as_bytes(), &key, start(), "fixture").unwrap();
        assert_eq!(row.cumulative, vec![3, 5, 8]);
        assert_eq!(row.fields[1], "Testland");
    }

    #[test]
    fn state_must_match_exactly() {
        let key = RegionKey::new("Prov1", "Testland");
        let row = extract_series(FIXTURE.as_bytes(), &key, start(), "fixture").unwrap();
        assert_eq!(row.cumulative, vec![1, 1, 2]);

        let quoted = RegionKey::new("Bonaire, Sint Eustatius and Saba", "Netherlands");
        let row = extract_series(FIXTURE.as_bytes(), &quoted, start(), "fixture").unwrap();
        assert_eq!(row.cumulative, vec![0, 0, 4]);
    }

    #[test]
    fn unknown_region_is_reported() {
        let key = RegionKey::new("", "Atlantis");
        let err = extract_series(FIXTURE.as_bytes(), &key, start(), "fixture.csv").unwrap_err();
        match err {
            CovidError::RegionNotFound { country, file, .. } => {
                assert_eq!(country, "Atlantis");
                assert_eq!(file, "fixture.csv");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_start_column() {
        let key = RegionKey::new("", "Testland");
        let late = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let err = extract_series(FIXTURE.as_bytes(), &key, late, "fixture").unwrap_err();
        assert!(matches!(err, CovidError::MissingStartDate { .. }));
    }

    #[test]
    fn short_row_is_malformed() {
        let data = "a,b,3/1/20,3/2/20\n,Short,1\n";
        let key = RegionKey::new("", "Short");
        let err = extract_series(data.as_bytes(), &key, start(), "short").unwrap_err();
        assert!(matches!(
            err,
            CovidError::MalformedRow {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_value() {
        let data = "a,b,3/1/20,3/2/20\n,Bad,1,x\n";
        let key = RegionKey::new("", "Bad");
        let err = extract_series(data.as_bytes(), &key, start(), "bad").unwrap_err();
        assert!(matches!(err, CovidError::InvalidValue { column: 3, .. }));
    }

    #[test]
    fn counts_written_as_floats() {
        assert_eq!(parse_count(" 12 "), Some(12));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("12.5"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn lists_regions_in_file_order() {
        let regions = list_regions(FIXTURE.as_bytes(), "fixture").unwrap();
        let names: Vec<String> = regions.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "Testland",
                "Prov1; Testland",
                "Bonaire, Sint Eustatius and Saba; Netherlands"
            ]
        );
    }
}
