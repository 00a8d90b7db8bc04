use erddap_discharge::{FetchResult, fetch_default};

fn main() {
    let result = fetch_default();

    // The error detail would otherwise be dropped on the floor; surface it
    // on stderr without changing the one-line summary on stdout.
    if let FetchResult::Failure(f) = &result {
        eprintln!("fetch failed: {}", f.error);
    }

    println!("Retrieved {} rows", result.row_count());
}
