use crate::{appointment::Reading, schema::readings};
use chrono::NaiveDateTime;

#[derive(Queryable)]
pub struct ReadingData {
    pub id: u64,
    pub appointment_id: u64,
    pub time: NaiveDateTime,
    pub power: f64,
}

#[derive(Insertable)]
#[table_name = "readings"]
pub struct NewReading {
    pub appointment_id: u64,
    pub time: NaiveDateTime,
    pub power: f64,
}

impl From<ReadingData> for Reading {
    fn from(data: ReadingData) -> Self {
        Reading {
            time: data.time,
            power: data.power,
        }
    }
}
