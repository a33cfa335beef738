use crate::{appointment::Coordinate, schema::coordinates};

#[derive(Queryable, Insertable)]
#[table_name = "coordinates"]
pub struct CoordinateData {
    pub appointment_id: u64,
    pub position: i32,
    pub right_ascension: f64,
    pub declination: f64,
}

impl CoordinateData {
    pub fn new(appointment_id: u64, position: i32, coordinate: &Coordinate) -> Self {
        Self {
            appointment_id,
            position,
            right_ascension: coordinate.right_ascension,
            declination: coordinate.declination,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            right_ascension: self.right_ascension,
            declination: self.declination,
        }
    }
}
