/// Human-readable names for the columns of a WhatsApp `msgstore` message export.
pub const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("key_remote_jid", "Contact Numbers"),
    ("key_from_me", "Message is received or sent"),
    ("status", "Message status"),
    ("media_wa_type", "Message type"),
    ("timestamp", "Date and Time"),
];

/// Display name for a column, falling back to the raw column name.
pub fn display_name(column: &str) -> &str {
    for (name, display) in DISPLAY_NAMES {
        if *name == column {
            return display;
        }
    }
    column
}

pub fn join_display_names<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(display_name)
        .collect::<Vec<_>>()
        .join(", ")
}
