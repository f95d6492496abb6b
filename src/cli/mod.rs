//! # CLI Module
//!
//! Thin commands on top of [`SpotifyClient`]. Each command authorizes, runs
//! one high-level operation and prints the result either as a table or, with
//! `--json`, as JSON on stdout.
//!
//! ## Commands
//!
//! - [`auth`] - authorize the user flow and cache the refresh token
//! - [`search`] - best match for a title and artist
//! - [`playlist`], [`album`], [`liked`] - track listings
//! - [`playlists`], [`albums`] - library summaries
//! - [`features`] - audio features for a list of track ids
//! - [`library`] - every saved track, deduplicated and enriched
//!
//! ## Usage
//!
//! ```bash
//! spotcollect auth                       # consent once, refresh afterwards
//! spotcollect playlist 37i9dQZF1DXcBWIGoYBM5M --pages 2
//! spotcollect liked --features --json > liked.json
//! spotcollect --fail-fast library
//! ```
//!
//! Partial results are reported: a listing that lost pages, chunks or items
//! ends with a warning naming every failure.

mod auth;
mod features;
mod library;
mod tracks;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Table;

use crate::{
    AuthMode, Error, SpotifyClient,
    config::Settings,
    error,
    paging::{Aggregate, FailurePolicy},
    success, warning,
};

pub use auth::auth;
pub use features::features;
pub use library::{albums, library, playlists};
pub use tracks::{album, liked, playlist, search};

/// Output and failure handling shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub json: bool,
    pub fail_fast: bool,
}

impl Options {
    fn policy(&self) -> FailurePolicy {
        if self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::BestEffort
        }
    }
}

fn settings(opts: &Options) -> Settings {
    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Cannot load configuration. Err: {}", e),
    };
    if opts.fail_fast {
        settings.failure_policy = opts.policy();
    }
    settings
}

async fn connect(opts: &Options, user: bool) -> SpotifyClient {
    let settings = settings(opts);
    let mode = if user {
        AuthMode::User {
            scope: settings.scope.clone(),
        }
    } else {
        AuthMode::AppOnly
    };

    match SpotifyClient::connect(&settings, mode).await {
        Ok(client) => client,
        Err(e) => error!(
            "Authorization failed. Please run spotcollect auth --fresh\n Error: {}",
            e
        ),
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

/// Unwraps a library result, exiting with the error message on failure.
fn finish<T>(pb: ProgressBar, result: Result<Aggregate<T>, Error>, what: &str) -> Aggregate<T> {
    pb.finish_and_clear();
    match result {
        Ok(aggregate) => {
            report(&aggregate, what);
            aggregate
        }
        Err(e) => error!("Failed to fetch {}. Err: {}", what, e),
    }
}

fn report<T>(aggregate: &Aggregate<T>, what: &str) {
    if aggregate.is_complete() {
        success!("Fetched {} {}", aggregate.len(), what);
        return;
    }

    warning!(
        "Fetched {} {}, result is incomplete ({} failures)",
        aggregate.len(),
        what,
        aggregate.failures.len()
    );
    for failure in &aggregate.failures {
        warning!("  {:?}: {}", failure.site, failure.error);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Cannot serialize output. Err: {}", e),
    }
}

fn print_table<R: tabled::Tabled>(rows: Vec<R>) {
    if rows.is_empty() {
        warning!("Nothing to show");
        return;
    }
    println!("{}", Table::new(rows));
}
