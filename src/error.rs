use anyhow::anyhow;
use reqwest::StatusCode;

/// Pulls the quoted message out of an ERDDAP error payload.
///
/// ERDDAP reports failures as plain text shaped like:
///
/// ```text
/// Error {
///     code=404;
///     message="Not Found: Currently unknown datasetID=foo";
/// }
/// ```
///
/// Embedded quotes are backslash-escaped; the scan honors that.
pub(crate) fn extract_erddap_message(body: &str) -> Option<String> {
    let start = body.find("message=\"")? + "message=\"".len();
    let mut out = String::new();
    let mut chars = body[start..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(esc) = chars.next() {
                    out.push(esc);
                }
            }
            '"' => return Some(out),
            _ => out.push(c),
        }
    }
    None
}

pub(crate) fn format_erddap_error(status: StatusCode, url: &str, body: &str) -> anyhow::Error {
    let message = extract_erddap_message(body)
        .unwrap_or_else(|| body.lines().next().unwrap_or("").trim().to_string());

    if status == StatusCode::NOT_FOUND {
        // 404 covers both unknown dataset ids and constraints that matched
        // no rows; the server message distinguishes the two.
        return anyhow!(
            "ERDDAP resource not found (HTTP 404).\n- Check the dataset id against the server's tabledap index, or relax the constraints\n\nServer message: {}\nrequest: {}",
            message,
            url
        );
    }

    if status == StatusCode::BAD_REQUEST {
        return anyhow!(
            "ERDDAP rejected the query (HTTP 400).\n- Check variable names and constraint syntax (e.g. `time>=YYYY-MM-DD`)\n\nServer message: {}\nrequest: {}",
            message,
            url
        );
    }

    anyhow!(
        "ERDDAP request failed: HTTP {} for url ({})\n{}",
        status,
        url,
        message
    )
}
