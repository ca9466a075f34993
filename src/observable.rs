use crate::error::{Error, Result};
use crate::prelude::*;
use csv;
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

enum ObservationPartial {
    Zone(Zone),
    Value(String, f64),
}

impl ObservationPartial {
    fn to_observation(&self, specimen: SpecimenId, site: Site, day: Day) -> Observation {
        match self {
            Self::Zone(zone) => Observation::Zone(specimen, site, day, *zone),
            Self::Value(property, value) => {
                Observation::Value(specimen, site, day, property.to_string(), *value)
            }
        }
    }
}

#[derive(Clone)]
enum Field {
    Specimen,
    Site,
    Day,
    Zone,
    Property(String),
}

/// Produces Observations from tidy delimited data
///
/// Each line holds one site of one specimen on one day. `Csv` implements
/// Iterator so it can be passed directly to `DatasetBuilder::observe()`.
pub struct Csv {
    records: std::iter::Enumerate<csv::StringRecordsIntoIter<Box<dyn Read>>>,
    fields: Vec<Field>,
    missing: Vec<String>,
    observation_buffer: VecDeque<Observation>,
}

impl Csv {
    fn new(
        records: csv::StringRecordsIntoIter<Box<dyn Read>>,
        fields: Vec<Field>,
        missing: &[String],
    ) -> Self {
        Self {
            records: records.enumerate(),
            fields,
            missing: missing.to_vec(),
            observation_buffer: VecDeque::new(),
        }
    }

    fn is_missing(&self, field: &str) -> bool {
        let field = field.trim();
        self.missing.iter().any(|token| token.eq_ignore_ascii_case(field))
    }

    fn parse_row(&mut self, line: u64, row: &csv::StringRecord) -> Result<()> {
        let bad = |field: &str, value: &str| Error::Field {
            line,
            field: field.to_owned(),
            value: value.to_owned(),
        };

        let mut specimen: Option<SpecimenId> = None;
        let mut site: Site = 0;
        let mut day: Option<Day> = None;
        let mut partials = vec![];
        for (i, value) in row.iter().enumerate() {
            let field = match self.fields.get(i) {
                Some(field) => field,
                None => continue,
            };
            match field {
                Field::Specimen => {
                    specimen = Some(value.trim().parse().map_err(|_| bad("specimen", value))?);
                }
                Field::Site => {
                    site = value.trim().parse().map_err(|_| bad("site", value))?;
                }
                Field::Day => {
                    let digits = value.trim().trim_start_matches(&['J', 'j'][..]);
                    day = Some(digits.parse().map_err(|_| bad("day", value))?);
                }
                Field::Zone => {
                    if self.is_missing(value) {
                        continue;
                    }
                    let mut letters = value.trim().chars();
                    let zone = match (letters.next().and_then(Zone::from_letter), letters.next()) {
                        (Some(zone), None) => zone,
                        _ => return Err(bad("zone", value)),
                    };
                    partials.push(ObservationPartial::Zone(zone));
                }
                Field::Property(name) => {
                    let number = if self.is_missing(value) {
                        f64::NAN
                    } else {
                        value.trim().parse().map_err(|_| bad(name.as_str(), value))?
                    };
                    partials.push(ObservationPartial::Value(name.clone(), number));
                }
            }
        }

        let specimen = specimen.ok_or_else(|| bad("specimen", ""))?;
        let day = day.ok_or_else(|| bad("day", ""))?;
        self.observation_buffer = partials
            .iter()
            .map(|x| x.to_observation(specimen, site, day))
            .collect();
        Ok(())
    }
}

impl Iterator for Csv {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Result<Observation>> {
        while self.observation_buffer.is_empty() {
            let (idx, row) = self.records.next()?;
            let row = match row {
                Ok(row) => row,
                Err(e) => return Some(Err(e.into())),
            };
            // Header is line 1.
            if let Err(e) = self.parse_row(idx as u64 + 2, &row) {
                return Some(Err(e));
            }
        }
        self.observation_buffer.pop_front().map(Ok)
    }
}

pub struct CsvBuilder {
    delimiter: u8,
    specimen_field: String,
    site_field: String,
    day_field: String,
    zone_field: String,
    missing: Vec<String>,
}

impl Default for CsvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvBuilder {
    /// Construct a new Csv builder
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            specimen_field: "specimen".to_owned(),
            site_field: "site".to_owned(),
            day_field: "day".to_owned(),
            zone_field: "zone".to_owned(),
            missing: vec!["".to_owned(), "nan".to_owned(), "NA".to_owned()],
        }
    }

    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    pub fn specimen_field(&mut self, specimen_field: &str) -> &mut Self {
        self.specimen_field = specimen_field.to_owned();
        self
    }

    /// Column telling apart the sites of one specimen. Optional in the input.
    pub fn site_field(&mut self, site_field: &str) -> &mut Self {
        self.site_field = site_field.to_owned();
        self
    }

    pub fn day_field(&mut self, day_field: &str) -> &mut Self {
        self.day_field = day_field.to_owned();
        self
    }

    pub fn zone_field(&mut self, zone_field: &str) -> &mut Self {
        self.zone_field = zone_field.to_owned();
        self
    }

    /// Cell contents read as missing values, compared case-insensitively.
    pub fn missing(&mut self, tokens: &[&str]) -> &mut Self {
        self.missing = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Csv> {
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        self.from_reader(Box::new(file))
    }

    pub fn from_reader(&self, reader: Box<dyn Read>) -> Result<Csv> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .from_reader(reader);

        let fields: Vec<Field> = rdr
            .headers()?
            .iter()
            .map(|s| match s.trim() {
                s if s == self.specimen_field => Field::Specimen,
                s if s == self.site_field => Field::Site,
                s if s == self.day_field => Field::Day,
                s if s == self.zone_field => Field::Zone,
                s => Field::Property(s.into()),
            })
            .collect();

        for (required, name) in &[
            (Field::Specimen, &self.specimen_field),
            (Field::Day, &self.day_field),
            (Field::Zone, &self.zone_field),
        ] {
            let present = fields
                .iter()
                .any(|f| std::mem::discriminant(f) == std::mem::discriminant(required));
            if !present {
                return Err(Error::MissingColumn(name.to_string()));
            }
        }

        Ok(Csv::new(rdr.into_records(), fields, &self.missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const WEIGHTS: &str = "specimen,site,day,zone,Weight,ITA\n\
                           1,0,J0,A,10.0,nan\n\
                           1,1,J0,B,,3.5\n\
                           2,0,0,E,30.0,4.0\n\
                           2,0,1,,31.0,NA\n";

    fn dataset(text: &'static str) -> std::result::Result<Dataset, Box<dyn Error>> {
        let mut builder = DatasetBuilder::new();
        builder.observe(CsvBuilder::new().from_reader(Box::new(text.as_bytes()))?)?;
        Ok(builder.build()?)
    }

    #[test]
    fn test_csv_has_correct_properties() -> std::result::Result<(), Box<dyn Error>> {
        let dataset = dataset(WEIGHTS)?;
        assert_eq!(dataset.properties(), vec!["ITA", "Weight"]);
        assert_eq!(dataset.specimens(), vec![1, 2]);
        assert_eq!(dataset.n_days(), 2);
        Ok(())
    }

    #[test]
    fn test_csv_reads_missing_tokens_as_nan() -> std::result::Result<(), Box<dyn Error>> {
        let dataset = dataset(WEIGHTS)?;
        let weight = dataset.property("Weight")?;
        assert_eq!(weight[[0, 0]], 10.0);
        assert!(weight[[1, 0]].is_nan());
        assert!(dataset.property("ITA")?[[0, 0]].is_nan());
        assert_eq!(dataset.zone(2, 0), Some(Zone::E));
        assert_eq!(dataset.zone(2, 1), None);
        Ok(())
    }

    #[test]
    fn test_csv_without_zone_column_is_rejected() {
        let reader = Box::new("specimen,day,Weight\n1,0,2.0\n".as_bytes());
        assert!(matches!(
            CsvBuilder::new().from_reader(reader),
            Err(crate::error::Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_csv_reports_bad_zone_with_line() -> std::result::Result<(), Box<dyn Error>> {
        let reader = Box::new("specimen,day,zone\n1,0,A\n1,1,F\n".as_bytes());
        let results: Vec<_> = CsvBuilder::new().from_reader(reader)?.collect();
        match results.last() {
            Some(Err(crate::error::Error::Field { line, field, .. })) => {
                assert_eq!(*line, 3);
                assert_eq!(field, "zone");
            }
            _ => panic!("expected a zone parse error"),
        }
        Ok(())
    }

    #[test]
    fn test_csv_custom_columns_and_delimiter() -> std::result::Result<(), Box<dyn Error>> {
        let text = "Souris;Jour;Zone;Poids\n7;0;c;21.5\n";
        let mut builder = DatasetBuilder::new();
        builder.observe(
            CsvBuilder::new()
                .delimiter(b';')
                .specimen_field("Souris")
                .day_field("Jour")
                .zone_field("Zone")
                .from_reader(Box::new(text.as_bytes()))?,
        )?;
        let dataset = builder.build()?;
        assert_eq!(dataset.property("Poids")?[[0, 0]], 21.5);
        assert_eq!(dataset.zone(0, 0), Some(Zone::C));
        Ok(())
    }
}
