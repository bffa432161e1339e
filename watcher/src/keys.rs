use chrono::NaiveDateTime;

/// File name for a motion snapshot taken at local time `at`.
/// e.g. "snap-2014-03-07-09-05-02.jpg"
pub fn snapshot_file_name(at: NaiveDateTime) -> String {
    at.format("snap-%Y-%m-%d-%H-%M-%S.jpg").to_string()
}
