#![cfg(not(tarpaulin_include))]

use feedback::bucket::{Granularity, available_periods};
use feedback::config::ReportOptions;
use feedback::downloader::{ExportFormat, export, export_filename, series_to_csv};
use feedback::filter::FilterSpec;
use feedback::loader::load_responses;
use feedback::report::{Report, build_report, comment_page, location_breakdown};
use feedback::paging::Page;
use feedback::response::{Response, ResponseStore, parse_date};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let s = Instant::now();
    let args: Vec<String> = env::args().collect();

    let (path, options) = match args.len() {
        2 => (&args[1], ReportOptions::default()),
        4 if args[2] == "--config" => (&args[1], ReportOptions::from_json_file(&args[3])?),
        _ => {
            eprintln!("Usage: {} <responses.json|responses.csv> [--config <options.json>]", args[0]);
            return Ok(());
        }
    };

    let store = ResponseStore::fetch(|| {
        let loaded = load_responses(path)?;
        log::info!(
            "loaded {} responses from {} ({} rejected)",
            loaded.responses.len(),
            path,
            loaded.rejected.len()
        );
        Ok(loaded.responses)
    })?;

    let mut session = Session {
        store,
        spec: FilterSpec::new(),
        options,
        comments_only: false,
    };

    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    let mut show = true;
    loop {
        if show {
            session.display();
        }

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command).is_err() || command.is_empty() {
            break;
        }
        let command = command.trim();

        start_time = Instant::now();

        if command.is_empty() {
            status = String::from("invalid command");
            continue;
        }

        if command == "help" {
            print_help();
            continue;
        }

        if command == "q" {
            break;
        }

        let (name, arg) = match command.split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        status = match session.apply(name, arg) {
            Ok(()) => String::from("ok"),
            Err(e) => e,
        };

        match name {
            "disable_output" => show = false,
            "enable_output" => show = true,
            _ => {}
        }
    }

    let e = s.elapsed().as_secs_f64();
    println!("Total elapsed time: {:.1} seconds", e);

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  w / s: Previous / next page");
    println!("  page <n>, size <n>: Jump to a page, change the page size");
    println!("  search <text>: Filter locations containing text (empty clears)");
    println!("  location <name>: Only this location (empty clears)");
    println!("  min <n>, max <n>: Score bounds (min -1..10, max 0..11)");
    println!("  from <date>, to <date>: Date bounds (empty clears)");
    println!("  comments: Toggle the comment list");
    println!("  clear: Reset every filter");
    println!("  sort <score|date|location|id>, toggle: Order of the list");
    println!("  by <day|week|month|year>: Trend granularity");
    println!("  locations [term]: List known locations");
    println!("  periods [granularity]: List periods that have responses");
    println!("  breakdown: NPS per location");
    println!("  export [csv|json|xml|xlsx]: Write the filtered responses");
    println!("  export_trend: Write the trend series as CSV");
    println!("  disable_output / enable_output: Toggle the report display");
}

struct Session {
    store: ResponseStore,
    spec: FilterSpec,
    options: ReportOptions,
    comments_only: bool,
}

impl Session {
    fn report(&self) -> Report {
        build_report(&self.store, &self.spec, &self.options)
    }

    fn display(&self) {
        let report = self.report();

        for issue in &report.issues {
            println!("! {}", issue);
        }

        println!(
            "{} of {} responses | NPS {:.1} | gauge {:.2}",
            report.matched,
            self.store.len(),
            report.nps.nps,
            report.nps.gauge
        );
        for slice in &report.nps.pie {
            println!("  {:<11} {:>5} {:>6.1}%", slice.label, slice.count, slice.percent);
        }

        println!("Trend by {}:", report.trend.granularity);
        for bucket in &report.trend.buckets {
            println!("  {:<10} {:>5.2} ({})", bucket.label, bucket.mean, bucket.count);
        }
        if report.trend.skipped > 0 {
            println!("  ({} undated)", report.trend.skipped);
        }

        let page = if self.comments_only {
            comment_page(&self.store, &self.spec, &self.options).0
        } else {
            report.list
        };
        Self::print_page(&page);
    }

    fn current_page(&self) -> Page<Response> {
        if self.comments_only {
            comment_page(&self.store, &self.spec, &self.options).0
        } else {
            self.report().list
        }
    }

    fn print_page(page: &Page<Response>) {
        println!(
            "Page {}/{} ({} items)",
            page.page_number, page.total_pages, page.total_items
        );
        for response in &page.items {
            let date = response
                .timestamp()
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_default();
            println!(
                "  {:>2} {:<20} {:<10} {}",
                response.score(),
                response.location(),
                date,
                response.comment()
            );
        }
    }

    fn apply(&mut self, name: &str, arg: &str) -> Result<(), String> {
        match name {
            "w" => {
                self.options.page = self.options.page.saturating_sub(1).max(1);
            }
            "s" => {
                self.options.page = self.current_page().next_number();
            }
            "page" => self.options.page = parse_number(arg)?,
            "size" => {
                self.options.page_size = parse_number(arg)?;
                self.options.page = 1;
            }
            "search" => {
                self.spec.search_text = arg.to_string();
                self.options.page = 1;
            }
            "location" => {
                self.spec.location = (!arg.is_empty()).then(|| arg.to_string());
                self.options.page = 1;
            }
            "min" => self
                .spec
                .set_score_min(parse_number(arg)?)
                .map_err(|e| e.to_string())?,
            "max" => self
                .spec
                .set_score_max(parse_number(arg)?)
                .map_err(|e| e.to_string())?,
            "from" => self.spec.date_start = parse_optional_date(arg)?,
            "to" => self.spec.date_end = parse_optional_date(arg)?,
            "comments" => {
                self.comments_only = !self.comments_only;
                self.options.page = 1;
            }
            "clear" => {
                self.spec = FilterSpec::new();
                self.comments_only = false;
                self.options.page = 1;
            }
            "sort" => self.options.sort_key = arg.parse().map_err(|e: feedback::FeedbackError| e.to_string())?,
            "toggle" => self.options.sort_direction = self.options.sort_direction.toggled(),
            "by" => {
                self.options.granularity = arg.parse().map_err(|e: feedback::FeedbackError| e.to_string())?
            }
            "locations" => {
                let names = if arg.is_empty() {
                    self.store.locations()
                } else {
                    self.store.search_locations(arg)
                };
                for name in names {
                    println!("  {}", if name.is_empty() { "(none)" } else { name.as_str() });
                }
            }
            "periods" => {
                let granularity = if arg.is_empty() {
                    self.options.granularity
                } else {
                    arg.parse::<Granularity>().map_err(|e| e.to_string())?
                };
                for period in available_periods(&self.store, granularity, None) {
                    let (first, last) = period.date_range();
                    println!("  {} ({} .. {})", period, first, last);
                }
            }
            "breakdown" => {
                for row in location_breakdown(&self.store, &self.spec) {
                    println!(
                        "  {:<20} NPS {:>6.1} ({} responses)",
                        row.location,
                        row.summary.nps_rounded(),
                        row.summary.total
                    );
                }
            }
            "export" => {
                let format = if arg.is_empty() {
                    self.options.export_format
                } else {
                    arg.parse::<ExportFormat>().map_err(|e| e.to_string())?
                };
                let matched = feedback::filter::filter(&self.store, &self.spec);
                let bytes = export(&matched, format).map_err(|e| e.to_string())?;
                let filename = export_filename(self.spec.location.as_deref(), format);
                fs::write(&filename, bytes).map_err(|e| e.to_string())?;
                log::info!("exported {} responses to {}", matched.len(), filename);
            }
            "export_trend" => {
                let report = self.report();
                let filename = format!("trend_{}.csv", report.trend.granularity);
                fs::write(&filename, series_to_csv(&report.trend)).map_err(|e| e.to_string())?;
                log::info!("exported {} periods to {}", report.trend.buckets.len(), filename);
            }
            "disable_output" | "enable_output" => {}
            _ => return Err(String::from("invalid command")),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(arg: &str) -> Result<T, String> {
    arg.parse().map_err(|_| format!("invalid number: {}", arg))
}

fn parse_optional_date(arg: &str) -> Result<Option<chrono::NaiveDate>, String> {
    if arg.is_empty() {
        return Ok(None);
    }
    parse_date(arg).map(Some).map_err(|e| e.to_string())
}
