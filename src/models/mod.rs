pub mod allotted_time_caps;
pub mod appointment_viewers;
pub mod appointments;
pub mod coordinates;
pub mod orientations;
pub mod readings;
pub mod receiver_configs;
pub mod user_roles;
pub mod users;

pub mod user_logins;
