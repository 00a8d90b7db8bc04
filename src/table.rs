use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single CSV cell after best-effort type inference.
///
/// A cell becomes `Num` if it parses as an `f64` (which includes ERDDAP's
/// `NaN` placeholder for missing numeric readings), `Null` if it is empty,
/// and `Str` otherwise. Serializes untagged: `1.23`, `null`, `"S1"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Num(f64),
    Str(String),
}

impl Value {
    fn infer(cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match cell.parse::<f64>() {
            Ok(n) => Value::Num(n),
            Err(_) => Value::Str(cell.to_string()),
        }
    }
}

/// One data row keyed by column name, in column order.
///
/// Serializes as a JSON object whose keys appear in the table's column
/// order (a plain map would sort them).
#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub Vec<(String, Value)>);

impl Record {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A parsed tabledap response: ordered columns plus typed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Parses CSV text, discarding `skip` leading lines before treating the
    /// next line as the header row.
    ///
    /// ERDDAP prefixes its `.csv` responses with a short non-data preamble;
    /// the discharge fetcher skips exactly two lines. Rows shorter or longer
    /// than the header are padded with `Null` or truncated so the schema
    /// stays uniform.
    pub fn from_csv(text: &str, skip: usize) -> Result<Table> {
        let mut remaining = text;
        for n in 0..skip {
            match remaining.split_once('\n') {
                Some((_, rest)) => remaining = rest,
                None => {
                    // A trailing chunk without a newline still counts as a line.
                    let got = n + usize::from(!remaining.is_empty());
                    bail!(
                        "CSV response ended inside the preamble (expected {} line(s), got {})",
                        skip,
                        got
                    )
                }
            }
        }

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(remaining.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .context("failed to read CSV header row")?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.is_empty() || (columns.len() == 1 && columns[0].is_empty()) {
            bail!("CSV response contained no header row");
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("malformed CSV row")?;
            let mut row: Vec<Value> = record.iter().map(Value::infer).collect();
            row.resize(columns.len(), Value::Null);
            rows.push(row);
        }

        Ok(Table { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Each row as a column-name-to-value mapping, preserving column order.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| Record(self.columns.iter().cloned().zip(row.iter().cloned()).collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "units-preamble-line\n\
                          metadata-preamble-line\n\
                          station,longitude,time,pls_lvl\n\
                          S1,-123.4,2024-01-01T00:00:00Z,1.23\n\
                          S2,-123.5,2024-01-02T00:00:00Z,2.34\n";

    #[test]
    fn parses_sample_after_two_line_preamble() {
        let table = Table::from_csv(SAMPLE, 2).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns, ["station", "longitude", "time", "pls_lvl"]);

        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("station"), Some(&Value::Str("S1".into())));
        assert_eq!(records[0].get("longitude"), Some(&Value::Num(-123.4)));
        assert_eq!(
            records[0].get("time"),
            Some(&Value::Str("2024-01-01T00:00:00Z".into()))
        );
        assert_eq!(records[0].get("pls_lvl"), Some(&Value::Num(1.23)));
        assert_eq!(records[1].get("station"), Some(&Value::Str("S2".into())));
        assert_eq!(records[1].get("pls_lvl"), Some(&Value::Num(2.34)));
    }

    #[test]
    fn record_keys_match_columns_for_every_row() {
        let table = Table::from_csv(SAMPLE, 2).unwrap();
        for record in table.records() {
            let keys: Vec<&str> = record.keys().collect();
            assert_eq!(keys, table.columns);
        }
    }

    #[test]
    fn short_and_long_rows_are_normalized() {
        let text = "a,b,c\n1,2\n1,2,3,4\n";
        let table = Table::from_csv(text, 0).unwrap();
        assert_eq!(table.rows[0], [Value::Num(1.0), Value::Num(2.0), Value::Null]);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn empty_cells_and_nan_are_missing_values() {
        let text = "station,pls_lvl\nS1,NaN\nS2,\n";
        let table = Table::from_csv(text, 0).unwrap();
        match table.rows[0][1] {
            Value::Num(n) => assert!(n.is_nan()),
            ref other => panic!("expected NaN, got {:?}", other),
        }
        assert_eq!(table.rows[1][1], Value::Null);
    }

    #[test]
    fn truncated_preamble_is_an_error() {
        let err = Table::from_csv("only-one-line", 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CSV response ended inside the preamble (expected 2 line(s), got 1)"
        );

        let err = Table::from_csv("", 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CSV response ended inside the preamble (expected 2 line(s), got 0)"
        );
    }

    #[test]
    fn header_only_yields_zero_rows() {
        let table = Table::from_csv("x\ny\nstation,pls_lvl\n", 2).unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(table.records().is_empty());
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(Table::from_csv("x\ny\n", 2).is_err());
    }

    #[test]
    fn records_serialize_in_column_order() {
        let table = Table::from_csv(SAMPLE, 2).unwrap();
        let json = serde_json::to_string(&table.records()[0]).unwrap();
        assert_eq!(
            json,
            r#"{"station":"S1","longitude":-123.4,"time":"2024-01-01T00:00:00Z","pls_lvl":1.23}"#
        );
    }
}
