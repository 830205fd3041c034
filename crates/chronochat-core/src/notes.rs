//! Reference notes for the columns of a WhatsApp message-log export.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldNote {
    pub column: &'static str,
    pub description: &'static str,
    /// Known code values and their meaning, in ascending code order.
    pub codes: &'static [(&'static str, &'static str)],
}

const NOTES: &[FieldNote] = &[
    FieldNote {
        column: "timestamp",
        description: "Message time; epoch seconds are shown as a calendar date and time",
        codes: &[],
    },
    FieldNote {
        column: "key_remote_jid",
        description: "WhatsApp ID of the communication partner (contact number)",
        codes: &[],
    },
    FieldNote {
        column: "key_from_me",
        description: "Message direction",
        codes: &[("0", "incoming"), ("1", "outgoing")],
    },
    FieldNote {
        column: "status",
        description: "Message status",
        codes: &[
            ("0", "received"),
            ("4", "waiting on the server"),
            ("5", "received at the destination"),
            ("6", "control message"),
            ("13", "message opened by the recipient (read)"),
        ],
    },
    FieldNote {
        column: "media_wa_type",
        description: "Message type",
        codes: &[
            ("0", "text"),
            ("1", "image"),
            ("2", "audio"),
            ("3", "video"),
            ("4", "contact card"),
            ("5", "geo position"),
        ],
    },
    FieldNote {
        column: "need_push",
        description: "Broadcast flag",
        codes: &[("0", "not a broadcast"), ("2", "broadcast message")],
    },
];

pub fn field_notes() -> &'static [FieldNote] {
    NOTES
}

pub fn field_note(column: &str) -> Option<&'static FieldNote> {
    NOTES.iter().find(|note| note.column == column)
}

/// Meaning of a code value in one of the documented columns.
pub fn describe_code(column: &str, code: &str) -> Option<&'static str> {
    field_note(column)?
        .codes
        .iter()
        .find(|(value, _)| *value == code.trim())
        .map(|(_, meaning)| *meaning)
}
