diesel::table! {
    bar (id) {
        id -> Int4,
        name -> Varchar,
    }
}

diesel::table! {
    beer (id) {
        id -> Int4,
        name -> Varchar,
        bar_id -> Int4,
        brewery_id -> Int4,
    }
}

diesel::table! {
    beer_rating (id) {
        id -> Int4,
        user_id -> Int4,
        beer_id -> Int4,
        rating -> Int2,
    }
}

diesel::table! {
    brewery (id) {
        id -> Int4,
        name -> Varchar,
        location -> Varchar,
    }
}

diesel::table! {
    login_session (id) {
        id -> Varchar,
        user_id -> Int4,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    star_beer (id) {
        id -> Int4,
        user_id -> Int4,
        beer_id -> Int4,
    }
}

diesel::table! {
    user_permission (user_id, codename) {
        user_id -> Int4,
        codename -> Varchar,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        password_hash -> Varchar,
        is_superuser -> Bool,
        date_joined -> Timestamptz,
    }
}

diesel::joinable!(beer -> bar (bar_id));
diesel::joinable!(beer -> brewery (brewery_id));
diesel::joinable!(beer_rating -> beer (beer_id));
diesel::joinable!(beer_rating -> users (user_id));
diesel::joinable!(login_session -> users (user_id));
diesel::joinable!(star_beer -> beer (beer_id));
diesel::joinable!(star_beer -> users (user_id));
diesel::joinable!(user_permission -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    bar,
    beer,
    beer_rating,
    brewery,
    login_session,
    star_beer,
    user_permission,
    users,
);
