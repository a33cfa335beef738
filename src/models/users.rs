use crate::schema::users;

#[derive(Queryable)]
pub struct UserData {
    pub id: u64,
    pub username: String,
    pub password: String,
}

#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
