// Table declarations matching `migrations/`. Regenerate with `diesel print-schema`.

diesel::table! {
    facilities (id) {
        id -> Int8,
        name -> Text,
        current_temp_c -> Float8,
        min_temp_c -> Float8,
        max_temp_c -> Float8,
        last_update -> Timestamptz,
    }
}

diesel::table! {
    feedbacks (id) {
        id -> Int8,
        facility_id -> Int8,
        submitted_by -> Nullable<Text>,
        rating -> Text,
        submitted_at -> Timestamptz,
    }
}

diesel::table! {
    temperature_history (id) {
        id -> Int8,
        facility_id -> Int8,
        temperature_c -> Float8,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    temperature_readings (id) {
        id -> Int8,
        facility_id -> Int8,
        submitted_by -> Text,
        temperature_c -> Float8,
        upvotes -> Int8,
        downvotes -> Int8,
        submitted_at -> Timestamptz,
    }
}

diesel::table! {
    temperature_votes (id) {
        id -> Int8,
        reading_id -> Int8,
        is_upvote -> Bool,
        cast_at -> Timestamptz,
    }
}

diesel::joinable!(temperature_votes -> temperature_readings (reading_id));

diesel::allow_tables_to_appear_in_same_query!(
    facilities,
    feedbacks,
    temperature_history,
    temperature_readings,
    temperature_votes,
);
