//! SQL schema definitions.

/// Complete schema for the SharePool v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Accounts
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

-- ============================================================
-- Catalogue
-- ============================================================

CREATE TABLE IF NOT EXISTS subscription_platforms (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    logo_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_by INTEGER REFERENCES users(id),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS shared_subscriptions (
    id INTEGER PRIMARY KEY,
    platform_id INTEGER NOT NULL REFERENCES subscription_platforms(id),
    owner_id INTEGER NOT NULL REFERENCES users(id),
    credentials_username TEXT NOT NULL,
    credentials_password TEXT NOT NULL,
    price_per_hour INTEGER NOT NULL CHECK (price_per_hour > 0),
    is_active INTEGER NOT NULL DEFAULT 1,
    is_verified INTEGER NOT NULL DEFAULT 0,
    verification_note TEXT,
    verified_by_admin_id INTEGER REFERENCES users(id),
    total_shares_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    expires_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_shared_platform ON shared_subscriptions(platform_id);
CREATE INDEX IF NOT EXISTS idx_shared_owner ON shared_subscriptions(owner_id);

-- ============================================================
-- Access grants
-- ============================================================

CREATE TABLE IF NOT EXISTS subscription_access (
    id INTEGER PRIMARY KEY,
    subscription_id INTEGER NOT NULL REFERENCES shared_subscriptions(id),
    buyer_id INTEGER NOT NULL REFERENCES users(id),
    price_paid INTEGER NOT NULL CHECK (price_paid > 0),
    commission_amount INTEGER NOT NULL CHECK (commission_amount >= 0),
    commission_rate_bp INTEGER NOT NULL CHECK (commission_rate_bp BETWEEN 0 AND 10000),
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'expired', 'cancelled')),
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    CHECK (end_time > start_time)
);

-- At most one active grant per (buyer, subscription).
CREATE UNIQUE INDEX IF NOT EXISTS idx_access_one_active
    ON subscription_access(buyer_id, subscription_id) WHERE status = 'active';
CREATE INDEX IF NOT EXISTS idx_access_due
    ON subscription_access(end_time) WHERE status = 'active';

-- Expired and cancelled are terminal.
CREATE TRIGGER IF NOT EXISTS trg_access_status_terminal
BEFORE UPDATE OF status ON subscription_access
WHEN OLD.status <> 'active' AND NEW.status <> OLD.status
BEGIN
    SELECT RAISE(ABORT, 'access grant status is terminal');
END;

-- ============================================================
-- Ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    amount INTEGER NOT NULL,
    type TEXT NOT NULL
        CHECK (type IN ('topup', 'purchase', 'earning', 'refund', 'commission')),
    status TEXT NOT NULL DEFAULT 'completed'
        CHECK (status IN ('pending', 'completed', 'failed', 'cancelled')),
    reference_id TEXT,
    commission_rate_bp INTEGER,
    commission_amount INTEGER,
    grant_id INTEGER REFERENCES subscription_access(id),
    notes TEXT,
    processed_by_admin_id INTEGER REFERENCES users(id),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_transactions_grant ON transactions(grant_id);

CREATE TRIGGER IF NOT EXISTS trg_transactions_no_update
BEFORE UPDATE ON transactions
BEGIN
    SELECT RAISE(ABORT, 'transactions are append-only');
END;

CREATE TRIGGER IF NOT EXISTS trg_transactions_no_delete
BEFORE DELETE ON transactions
BEGIN
    SELECT RAISE(ABORT, 'transactions are append-only');
END;

CREATE TABLE IF NOT EXISTS topup_requests (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    amount INTEGER NOT NULL CHECK (amount > 0),
    transaction_id TEXT NOT NULL UNIQUE,
    screenshot_url TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    reviewed_by_admin_id INTEGER REFERENCES users(id),
    review_notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_topups_user ON topup_requests(user_id);
CREATE INDEX IF NOT EXISTS idx_topups_status ON topup_requests(status);

CREATE TRIGGER IF NOT EXISTS trg_topup_status_terminal
BEFORE UPDATE OF status ON topup_requests
WHEN OLD.status <> 'pending' AND NEW.status <> OLD.status
BEGIN
    SELECT RAISE(ABORT, 'topup request status is terminal');
END;

-- ============================================================
-- Moderation
-- ============================================================

CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY,
    reported_by INTEGER NOT NULL REFERENCES users(id),
    subscription_id INTEGER NOT NULL REFERENCES shared_subscriptions(id),
    reason TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'resolved', 'dismissed')),
    resolved_by_admin_id INTEGER REFERENCES users(id),
    resolution_notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- One open report per (reporter, subscription).
CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_one_pending
    ON reports(reported_by, subscription_id) WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);

-- ============================================================
-- Settings & throttling
-- ============================================================

CREATE TABLE IF NOT EXISTS platform_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    description TEXT,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS rate_limits (
    bucket TEXT PRIMARY KEY,
    window_start INTEGER NOT NULL,
    hits INTEGER NOT NULL
);
"#;
