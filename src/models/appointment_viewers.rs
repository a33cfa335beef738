use crate::schema::appointment_viewers;

#[derive(Queryable, Insertable)]
#[table_name = "appointment_viewers"]
pub struct ViewerData {
    pub appointment_id: u64,
    pub user_id: u64,
}
