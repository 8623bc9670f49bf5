use super::{ColumnDef, ColumnKind, SortOrder, TableDef};

pub const ROLES: &[&str] = &["user", "admin"];
pub const DIFFICULTIES: &[&str] = &["facil", "medio", "dificil"];
pub const ANSWER_LETTERS: &[&str] = &["A", "B", "C", "D", "E"];
pub const ATTEMPT_STATUSES: &[&str] = &["in_progress", "finished", "expired"];
pub const ACTION_TYPES: &[&str] = &["create", "update", "delete", "upload"];

const fn col(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        nullable: true,
        required: false,
        editable: true,
        searchable: false,
        filterable: false,
    }
}

const fn system(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef { editable: false, filterable: true, ..col(name, kind) }
}

const fn required(mut c: ColumnDef) -> ColumnDef {
    c.nullable = false;
    c.required = true;
    c
}

const fn searchable(mut c: ColumnDef) -> ColumnDef {
    c.searchable = true;
    c
}

const fn filterable(mut c: ColumnDef) -> ColumnDef {
    c.filterable = true;
    c
}

const fn reference(mut c: ColumnDef) -> ColumnDef {
    c.nullable = false;
    c.required = true;
    c.filterable = true;
    c
}

const PROFILE_COLUMNS: &[ColumnDef] = &[
    system("id", ColumnKind::Uuid),
    required(searchable(filterable(col("email", ColumnKind::Text)))),
    searchable(col("full_name", ColumnKind::Text)),
    ColumnDef { nullable: false, ..filterable(col("role", ColumnKind::Enum(ROLES))) },
    col("avatar_url", ColumnKind::Text),
    system("created_at", ColumnKind::Timestamp),
    system("updated_at", ColumnKind::Timestamp),
];

const QUESTION_COLUMNS: &[ColumnDef] = &[
    system("id", ColumnKind::Uuid),
    required(searchable(col("statement", ColumnKind::Text))),
    required(col("alternatives", ColumnKind::Alternatives)),
    required(filterable(col("correct_answer", ColumnKind::Enum(ANSWER_LETTERS)))),
    required(searchable(filterable(col("subject", ColumnKind::Text)))),
    filterable(col("year", ColumnKind::IntegerRange { min: 1900, max: 2100 })),
    searchable(filterable(col("exam_board", ColumnKind::Text))),
    filterable(col("difficulty", ColumnKind::Enum(DIFFICULTIES))),
    col("image_url", ColumnKind::Text),
    system("created_at", ColumnKind::Timestamp),
    system("updated_at", ColumnKind::Timestamp),
];

const QUESTION_METADATA_COLUMNS: &[ColumnDef] = &[
    system("id", ColumnKind::Uuid),
    reference(col("question_id", ColumnKind::Uuid)),
    searchable(filterable(col("topic", ColumnKind::Text))),
    searchable(col("subtopic", ColumnKind::Text)),
    col("tags", ColumnKind::TextArray),
    searchable(col("explanation", ColumnKind::Text)),
    col("source", ColumnKind::Text),
    system("created_at", ColumnKind::Timestamp),
];

const ADMIN_ACTION_COLUMNS: &[ColumnDef] = &[
    system("id", ColumnKind::Uuid),
    reference(col("admin_id", ColumnKind::Uuid)),
    reference(col("action_type", ColumnKind::Enum(ACTION_TYPES))),
    reference(searchable(col("target_table", ColumnKind::Text))),
    filterable(col("target_id", ColumnKind::Text)),
    col("details", ColumnKind::Json),
    system("created_at", ColumnKind::Timestamp),
];

const ATTEMPT_COLUMNS: &[ColumnDef] = &[
    system("id", ColumnKind::Uuid),
    reference(col("user_id", ColumnKind::Uuid)),
    required(col("question_ids", ColumnKind::UuidList)),
    ColumnDef { nullable: false, ..filterable(col("status", ColumnKind::Enum(ATTEMPT_STATUSES))) },
    col("time_limit_minutes", ColumnKind::IntegerRange { min: 1, max: 600 }),
    col("started_at", ColumnKind::Timestamp),
    col("finished_at", ColumnKind::Timestamp),
    col("score", ColumnKind::IntegerRange { min: 0, max: 100 }),
    col("total_questions", ColumnKind::IntegerRange { min: 0, max: 100 }),
    system("created_at", ColumnKind::Timestamp),
];

const ANSWER_COLUMNS: &[ColumnDef] = &[
    system("id", ColumnKind::Uuid),
    reference(col("attempt_id", ColumnKind::Uuid)),
    reference(col("question_id", ColumnKind::Uuid)),
    required(col("selected_answer", ColumnKind::Enum(ANSWER_LETTERS))),
    filterable(col("is_correct", ColumnKind::Boolean)),
    col("answered_at", ColumnKind::Timestamp),
];

pub static TABLES: &[TableDef] = &[
    TableDef {
        name: "profiles",
        label: "Profiles",
        primary_key: "id",
        columns: PROFILE_COLUMNS,
        default_order: ("created_at", SortOrder::Desc),
        read_only: false,
    },
    TableDef {
        name: "questions",
        label: "Questions",
        primary_key: "id",
        columns: QUESTION_COLUMNS,
        default_order: ("created_at", SortOrder::Desc),
        read_only: false,
    },
    TableDef {
        name: "question_metadata",
        label: "Question metadata",
        primary_key: "id",
        columns: QUESTION_METADATA_COLUMNS,
        default_order: ("created_at", SortOrder::Desc),
        read_only: false,
    },
    TableDef {
        name: "admin_actions",
        label: "Admin actions",
        primary_key: "id",
        columns: ADMIN_ACTION_COLUMNS,
        default_order: ("created_at", SortOrder::Desc),
        read_only: true,
    },
    TableDef {
        name: "simulado_attempts",
        label: "Simulado attempts",
        primary_key: "id",
        columns: ATTEMPT_COLUMNS,
        default_order: ("started_at", SortOrder::Desc),
        read_only: false,
    },
    TableDef {
        name: "simulado_answers",
        label: "Simulado answers",
        primary_key: "id",
        columns: ANSWER_COLUMNS,
        default_order: ("answered_at", SortOrder::Desc),
        read_only: false,
    },
];
