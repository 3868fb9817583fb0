use crate::core::engine::RankedCourse;
use crate::utils::error::Result;
use std::io::Write;

pub const CSV_HEADER: [&str; 4] = ["rank", "code", "title", "course_id"];

/// Writes a ranking as CSV, one row per course in rank order.
pub fn write_rankings_csv<W: Write>(writer: W, rankings: &[RankedCourse]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for ranked in rankings {
        csv_writer.write_record([
            ranked.rank.to_string(),
            ranked.course.code.clone(),
            ranked.course.title.clone(),
            ranked.course.id.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn rankings_to_csv_string(rankings: &[RankedCourse]) -> Result<String> {
    let mut buffer = Vec::new();
    write_rankings_csv(&mut buffer, rankings)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
