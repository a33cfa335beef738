table! {
    allotted_time_caps (user_id) {
        user_id -> Unsigned<Bigint>,
        minutes -> Bigint,
    }
}

table! {
    appointment_orientations (appointment_id) {
        appointment_id -> Unsigned<Bigint>,
        azimuth -> Double,
        elevation -> Double,
    }
}

table! {
    appointment_viewers (appointment_id, user_id) {
        appointment_id -> Unsigned<Bigint>,
        user_id -> Unsigned<Bigint>,
    }
}

table! {
    appointments (id) {
        id -> Unsigned<Bigint>,
        user_id -> Unsigned<Bigint>,
        telescope_id -> Unsigned<Bigint>,
        start_time -> Datetime,
        end_time -> Datetime,
        status -> Varchar,
        observation_mode -> Varchar,
        is_public -> Bool,
        ended_at -> Nullable<Datetime>,
    }
}

table! {
    coordinates (appointment_id, position) {
        appointment_id -> Unsigned<Bigint>,
        position -> Integer,
        right_ascension -> Double,
        declination -> Double,
    }
}

table! {
    orientations (telescope_id) {
        telescope_id -> Unsigned<Bigint>,
        azimuth -> Double,
        elevation -> Double,
        calibrated_at -> Nullable<Datetime>,
    }
}

table! {
    readings (id) {
        id -> Unsigned<Bigint>,
        appointment_id -> Unsigned<Bigint>,
        time -> Datetime,
        power -> Double,
    }
}

table! {
    receiver_configs (appointment_id) {
        appointment_id -> Unsigned<Bigint>,
        center_frequency -> Double,
        bandwidth -> Double,
        integration_time -> Double,
    }
}

table! {
    telescopes (id) {
        id -> Unsigned<Bigint>,
        name -> Varchar,
        online -> Bool,
    }
}

table! {
    user_logins (token) {
        token -> Char,
        user_id -> Unsigned<Bigint>,
        login_time -> Datetime,
    }
}

table! {
    user_roles (id) {
        id -> Unsigned<Bigint>,
        user_id -> Unsigned<Bigint>,
        role -> Varchar,
        approved -> Bool,
    }
}

table! {
    users (id) {
        id -> Unsigned<Bigint>,
        username -> Varchar,
        password -> Char,
    }
}

allow_tables_to_appear_in_same_query!(
    allotted_time_caps,
    appointment_orientations,
    appointment_viewers,
    appointments,
    coordinates,
    orientations,
    readings,
    receiver_configs,
    telescopes,
    user_logins,
    user_roles,
    users,
);
