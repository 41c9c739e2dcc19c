//! `abacus` - live dashboard for beads issue trackers.
//!
//! Read-only over the beads stores: the dashboard never writes to
//! `.beads/`, it only watches and reports.

use abacus::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
