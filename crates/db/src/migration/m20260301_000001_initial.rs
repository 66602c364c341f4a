//! Initial database migration.
//!
//! Creates the community, unit, rate, billing and expense tables. The
//! `(unit_id, period_date)` uniqueness on `maintenance_records` is what
//! makes concurrent billing runs safe.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: COMMUNITIES & RESIDENTS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(COMMUNITIES_SQL).await?;
        db.execute_unprepared(UNITS_SQL).await?;

        // ============================================================
        // PART 3: RATES & BILLING
        // ============================================================
        db.execute_unprepared(RATE_CONFIGURATIONS_SQL).await?;
        db.execute_unprepared(MAINTENANCE_RECORDS_SQL).await?;

        // ============================================================
        // PART 4: EXPENSES
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE community_kind AS ENUM ('standalone', 'rate_based');
CREATE TYPE billing_status AS ENUM ('pending', 'submitted', 'paid');
CREATE TYPE expense_status AS ENUM ('pending', 'approved', 'rejected');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    full_name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const COMMUNITIES_SQL: &str = r"
CREATE TABLE communities (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    kind community_kind NOT NULL DEFAULT 'rate_based',
    -- Legacy rate fields, used when no rate configuration applies
    flat_amount NUMERIC(19, 4),
    fixed_amount NUMERIC(19, 4),
    opening_balance NUMERIC(19, 4),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_communities_active ON communities(id) WHERE is_active = true;
";

const UNITS_SQL: &str = r"
CREATE TABLE units (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    label VARCHAR(50) NOT NULL,
    flat_size NUMERIC(12, 2),
    maintenance_start_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_units_label UNIQUE (community_id, label)
);

CREATE INDEX idx_units_billable ON units(community_id) WHERE maintenance_start_date IS NOT NULL;
";

const RATE_CONFIGURATIONS_SQL: &str = r"
CREATE TABLE rate_configurations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    effective_date DATE NOT NULL,
    rate_per_area NUMERIC(19, 4) NOT NULL DEFAULT 0,
    fixed_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_rate_configurations_effective UNIQUE (community_id, effective_date),
    CONSTRAINT chk_rate_non_negative CHECK (rate_per_area >= 0 AND fixed_amount >= 0)
);
";

const MAINTENANCE_RECORDS_SQL: &str = r"
CREATE TABLE maintenance_records (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    unit_id UUID NOT NULL REFERENCES units(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    period_date DATE NOT NULL,
    amount NUMERIC(19, 4),
    status billing_status NOT NULL DEFAULT 'pending',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- Idempotency key for billing runs
    CONSTRAINT uq_maintenance_records_period UNIQUE (unit_id, period_date),
    CONSTRAINT chk_period_first_of_month CHECK (EXTRACT(DAY FROM period_date) = 1),
    CONSTRAINT chk_amount_non_negative CHECK (amount IS NULL OR amount >= 0)
);

CREATE INDEX idx_maintenance_records_community ON maintenance_records(community_id, period_date);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    description TEXT NOT NULL DEFAULT '',
    amount NUMERIC(19, 4),
    date DATE NOT NULL,
    status expense_status NOT NULL DEFAULT 'pending',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_expenses_approved ON expenses(community_id, date) WHERE status = 'approved';
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: touch_updated_at
-- Keeps communities.updated_at current
-- ============================================================
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_communities_updated_at
    BEFORE UPDATE ON communities
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_communities_updated_at ON communities;
DROP FUNCTION IF EXISTS touch_updated_at();

DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS maintenance_records CASCADE;
DROP TABLE IF EXISTS rate_configurations CASCADE;
DROP TABLE IF EXISTS units CASCADE;
DROP TABLE IF EXISTS communities CASCADE;
DROP TABLE IF EXISTS users CASCADE;

DROP TYPE IF EXISTS expense_status CASCADE;
DROP TYPE IF EXISTS billing_status CASCADE;
DROP TYPE IF EXISTS community_kind CASCADE;
";
