use std::io;

use seogen_core::BatchReport;

const CSV_HEADERS: [&str; 5] = ["page_id", "path", "status", "message", "model"];

/// Write one CSV row per page result.
pub fn write_csv<W: io::Write>(out: W, report: &BatchReport) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADERS)?;
    for result in &report.results {
        writer.write_record([
            result.page_id.as_str(),
            result.path.as_str(),
            result.status.as_str(),
            result.message.as_deref().unwrap_or_default(),
            result.model.as_deref().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seogen_core::models::{PageResult, PageStatus};

    #[test]
    fn writes_header_and_quoted_rows() {
        let report = BatchReport::from_results(
            2,
            "heuristic".into(),
            vec![
                PageResult {
                    page_id: "p1".into(),
                    path: "/faq".into(),
                    status: PageStatus::Success,
                    message: None,
                    model: Some("heuristic".into()),
                },
                PageResult {
                    page_id: "p2".into(),
                    path: "/b".into(),
                    status: PageStatus::Error,
                    message: Some("Page load failed: HTTP 404, then HTTP 404".into()),
                    model: Some("heuristic".into()),
                },
            ],
        );

        let mut buf = Vec::new();
        write_csv(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "page_id,path,status,message,model");
        assert_eq!(lines[1], "p1,/faq,success,,heuristic");
        assert_eq!(
            lines[2],
            "p2,/b,error,\"Page load failed: HTTP 404, then HTTP 404\",heuristic"
        );
    }
}
