//! Table definitions
//!
//! Applied by [`crate::Database::ensure_schema`]; every statement is
//! idempotent.

pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS applications (
        id BIGSERIAL PRIMARY KEY,
        app_index TEXT NOT NULL UNIQUE,
        year INTEGER NOT NULL,
        number INTEGER NOT NULL,
        status TEXT NOT NULL,
        user_id BIGINT NOT NULL,
        branch_id BIGINT NOT NULL,
        department_id BIGINT NOT NULL,
        room TEXT NOT NULL,
        issue TEXT NOT NULL,
        issue_comment TEXT,
        additional_comment TEXT,
        images JSONB NOT NULL DEFAULT '[]',
        inventory_id BIGINT,
        assigned_to BIGINT[] NOT NULL DEFAULT '{}',
        deadline TIMESTAMPTZ,
        completion_report JSONB,
        history JSONB NOT NULL DEFAULT '[]',
        lock_version INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (year, number)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS applications_status_idx ON applications (status)",
    "CREATE INDEX IF NOT EXISTS applications_user_idx ON applications (user_id)",
    "CREATE INDEX IF NOT EXISTS applications_assigned_idx ON applications USING GIN (assigned_to)",
    r#"
    CREATE TABLE IF NOT EXISTS tools (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        tool_number TEXT NOT NULL,
        serial TEXT,
        quantity BIGINT NOT NULL DEFAULT 0,
        written_off BIGINT NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'active',
        tags BIGINT[] NOT NULL DEFAULT '{}',
        history JSONB NOT NULL DEFAULT '[]',
        lock_version INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT tools_tool_number_key UNIQUE (tool_number),
        CONSTRAINT tools_name_key UNIQUE (name),
        CONSTRAINT tools_stock_check CHECK (written_off >= 0 AND written_off <= quantity)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        inventory_number TEXT NOT NULL,
        serial TEXT,
        images JSONB NOT NULL DEFAULT '[]',
        assigned_to BIGINT,
        assigned_to_model TEXT,
        assigned_at TIMESTAMPTZ,
        tags BIGINT[] NOT NULL DEFAULT '{}',
        branch_id BIGINT,
        department_id BIGINT,
        status TEXT NOT NULL DEFAULT 'active',
        qr_code_url TEXT NOT NULL,
        history JSONB NOT NULL DEFAULT '[]',
        lock_version INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT inventory_number_key UNIQUE (inventory_number)
    )
    "#,
];

/// Advisory lock key serializing application index allocation
pub const APPLICATION_INDEX_LOCK: i64 = 0x5344_0001;

/// Map a unique violation to the field it guards
pub fn unique_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "tools_tool_number_key" => Some("toolNumber"),
        "tools_name_key" => Some("name"),
        "inventory_number_key" => Some("inventoryNumber"),
        _ => None,
    }
}
