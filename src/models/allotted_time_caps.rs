use crate::schema::allotted_time_caps;

#[derive(Queryable, Insertable)]
#[table_name = "allotted_time_caps"]
pub struct AllottedTimeCapData {
    pub user_id: u64,
    pub minutes: i64,
}
