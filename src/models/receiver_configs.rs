use crate::{appointment::ReceiverConfig, schema::receiver_configs};

#[derive(Queryable, Insertable)]
#[table_name = "receiver_configs"]
pub struct ReceiverConfigData {
    pub appointment_id: u64,
    pub center_frequency: f64,
    pub bandwidth: f64,
    pub integration_time: f64,
}

impl ReceiverConfigData {
    pub fn new(appointment_id: u64, config: &ReceiverConfig) -> Self {
        Self {
            appointment_id,
            center_frequency: config.center_frequency,
            bandwidth: config.bandwidth,
            integration_time: config.integration_time,
        }
    }
}

impl From<ReceiverConfigData> for ReceiverConfig {
    fn from(data: ReceiverConfigData) -> Self {
        ReceiverConfig {
            center_frequency: data.center_frequency,
            bandwidth: data.bandwidth,
            integration_time: data.integration_time,
        }
    }
}
