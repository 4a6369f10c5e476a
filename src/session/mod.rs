//! Interactive filter session.
//!
//! Reads one command per line and recomputes both views whenever the
//! filter changes. Everything runs on the calling thread; the records
//! are never modified.

use crate::analysis::{build_views, DatasetFacets};
use crate::models::{AggregateViews, CaseRecord, FilterError, FilterState, Gender};
use crate::report::{AGE_REGION_TITLE, REGION_TITLE};
use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::debug;

/// Regions listed after each recomputation.
const TOP_REGIONS: usize = 5;

const HELP: &str = "\
Commands:
  genders <F,M,NR|all|none>   select genders
  age <min> <max>             set the inclusive age range
  reset                       restore the default filter
  show                        print the current views again
  facets                      print dataset facets
  help                        print this help
  quit                        leave the session";

/// A parsed session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Genders(GenderSelection),
    Age { min: u32, max: u32 },
    Reset,
    Show,
    Facets,
    Help,
    Quit,
}

/// Argument of the `genders` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenderSelection {
    All,
    None,
    Only(Vec<Gender>),
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or("").to_lowercase();
        let rest: Vec<&str> = parts.collect();

        match name.as_str() {
            "genders" | "gender" => {
                let arg = rest.join(" ");
                match arg.trim().to_lowercase().as_str() {
                    "" => Err("usage: genders <F,M,NR|all|none>".to_string()),
                    "all" => Ok(Command::Genders(GenderSelection::All)),
                    "none" => Ok(Command::Genders(GenderSelection::None)),
                    _ => parse_gender_list(&arg)
                        .map(|genders| Command::Genders(GenderSelection::Only(genders)))
                        .map_err(|e| e.to_string()),
                }
            }
            "age" => match rest.as_slice() {
                [min, max] => {
                    let min = min
                        .parse::<u32>()
                        .map_err(|_| format!("invalid age '{}'", min))?;
                    let max = max
                        .parse::<u32>()
                        .map_err(|_| format!("invalid age '{}'", max))?;
                    Ok(Command::Age { min, max })
                }
                _ => Err("usage: age <min> <max>".to_string()),
            },
            "reset" => Ok(Command::Reset),
            "show" => Ok(Command::Show),
            "facets" => Ok(Command::Facets),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

/// Parse a comma- or space-separated list of gender codes.
pub fn parse_gender_list(list: &str) -> Result<Vec<Gender>, FilterError> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Gender>)
        .collect()
}

/// Interactive session over a read-only set of records.
pub struct Session<'a> {
    records: &'a [CaseRecord],
    facets: DatasetFacets,
    filter: FilterState,
    views: AggregateViews,
}

impl<'a> Session<'a> {
    /// Create a session and compute the initial views.
    pub fn new(records: &'a [CaseRecord], filter: FilterState) -> Self {
        let facets = DatasetFacets::from_records(records);
        let views = build_views(records, &filter);
        Self {
            records,
            facets,
            filter,
            views,
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn views(&self) -> &AggregateViews {
        &self.views
    }

    /// Apply one command. Returns `false` when the session should end.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<bool> {
        debug!("Executing session command: {:?}", command);

        match command {
            Command::Genders(selection) => {
                let genders = match selection {
                    GenderSelection::All => self.facets.genders.clone(),
                    GenderSelection::None => Vec::new(),
                    GenderSelection::Only(genders) => genders,
                };
                let filter = self.filter.with_genders(genders);
                self.update(filter, out)?;
            }
            Command::Age { min, max } => match self.filter.with_age_range(min, max) {
                Ok(filter) => self.update(filter, out)?,
                Err(e) => writeln!(out, "error: {}", e)?,
            },
            Command::Reset => {
                let filter = self.facets.default_filter();
                self.update(filter, out)?;
            }
            Command::Show => self.print_views(out)?,
            Command::Facets => self.print_facets(out)?,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(false),
        }

        Ok(true)
    }

    /// Run until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        self.print_views(out)?;

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Ok(command) => {
                    if !self.execute(command, out)? {
                        break;
                    }
                }
                Err(message) => writeln!(out, "error: {}", message)?,
            }
        }

        Ok(())
    }

    fn update<W: Write>(&mut self, filter: FilterState, out: &mut W) -> Result<()> {
        self.views = build_views(self.records, &filter);
        self.filter = filter;
        self.print_views(out)
    }

    fn print_views<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "[{}] {} matching records", self.filter, self.views.filtered_records)?;

        if self.views.is_empty() {
            writeln!(out, "  No cases match the current filter.")?;
            return Ok(());
        }

        writeln!(out, "  {}:", REGION_TITLE)?;
        for region in self.views.region_counts.iter().take(TOP_REGIONS) {
            writeln!(out, "    {:<32} {:>8}", region.province, region.cases)?;
        }
        if self.views.region_counts.len() > TOP_REGIONS {
            writeln!(
                out,
                "    ... {} more",
                self.views.region_counts.len() - TOP_REGIONS
            )?;
        }
        writeln!(
            out,
            "  {}: {} rows",
            AGE_REGION_TITLE,
            self.views.age_region_counts.len()
        )?;

        Ok(())
    }

    fn print_facets<W: Write>(&self, out: &mut W) -> Result<()> {
        print_facets(&self.facets, out)
    }
}

/// Print dataset facets in a human-readable form.
pub fn print_facets<W: Write>(facets: &DatasetFacets, out: &mut W) -> Result<()> {
    let genders: Vec<&str> = facets.genders.iter().map(Gender::code).collect();

    writeln!(out, "Records:   {}", facets.total_records)?;
    writeln!(out, "Genders:   {}", genders.join(", "))?;
    match (facets.age_min, facets.age_max) {
        (Some(min), Some(max)) => writeln!(out, "Ages:      {}-{}", min, max)?,
        _ => writeln!(out, "Ages:      (none)")?,
    }
    let marks: Vec<String> = facets.age_marks.iter().map(u32::to_string).collect();
    writeln!(out, "Age marks: {}", marks.join(" "))?;
    writeln!(out, "Provinces: {}", facets.provinces.len())?;
    for province in &facets.provinces {
        writeln!(out, "  {}", province)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn records() -> Vec<CaseRecord> {
        vec![
            CaseRecord::new(Gender::Female, 34, "Buenos Aires"),
            CaseRecord::new(Gender::Male, 61, "CABA"),
            CaseRecord::new(Gender::Female, 29, "Córdoba"),
            CaseRecord::new(Gender::Male, 34, "Buenos Aires"),
            CaseRecord::new(Gender::Unknown, 47, "Santa Fe"),
        ]
    }

    /// Run a script against a fresh session; returns the final filter,
    /// views and everything printed.
    fn run_script(script: &str) -> (FilterState, AggregateViews, String) {
        let records = records();
        let facets = DatasetFacets::from_records(&records);
        let mut session = Session::new(&records, facets.default_filter());

        let mut out = Vec::new();
        session.run(Cursor::new(script), &mut out).unwrap();
        (
            session.filter().clone(),
            session.views().clone(),
            String::from_utf8(out).unwrap(),
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("genders F, M"),
            Ok(Command::Genders(GenderSelection::Only(vec![
                Gender::Female,
                Gender::Male
            ])))
        );
        assert_eq!(
            Command::parse("GENDERS all"),
            Ok(Command::Genders(GenderSelection::All))
        );
        assert_eq!(Command::parse("age 10 20"), Ok(Command::Age { min: 10, max: 20 }));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert!(Command::parse("age ten 20").is_err());
        assert!(Command::parse("genders Q").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn test_session_recomputes_on_filter_change() {
        let (filter, views, output) = run_script("genders F\nage 30 40\n");

        assert_eq!(
            filter,
            FilterState::new([Gender::Female], 30, 40).unwrap()
        );
        assert_eq!(views.filtered_records, 1);
        assert_eq!(views.region_counts[0].province, "Buenos Aires");
        // initial render + one per filter change
        assert_eq!(output.matches("matching records").count(), 3);
    }

    #[test]
    fn test_session_empty_selection_is_not_an_error() {
        let (_, views, output) = run_script("genders none\n");

        assert!(views.is_empty());
        assert!(output.contains("No cases match the current filter."));
        assert!(!output.contains("error:"));
    }

    #[test]
    fn test_session_reports_errors_and_continues() {
        let (filter, views, output) = run_script("age 50 10\nbogus\nage 40 70\n");

        assert!(output.contains("error: age range is inverted"));
        assert!(output.contains("error: unknown command 'bogus'"));
        assert_eq!(filter.age_min(), 40);
        assert_eq!(views.filtered_records, 2);
    }

    #[test]
    fn test_session_reset_and_quit() {
        let (filter, views, _) = run_script("genders M\nreset\nquit\ngenders none\n");

        assert_eq!(views.filtered_records, 5);
        assert_eq!(filter.genders().len(), 3);
    }

    #[test]
    fn test_print_facets() {
        let facets = DatasetFacets::from_records(&records());
        let mut out = Vec::new();
        print_facets(&facets, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Genders:   F, M, NR"));
        assert!(text.contains("Ages:      29-61"));
        assert!(text.contains("Age marks: 29 39 49 59"));
    }
}
