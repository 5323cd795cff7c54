//! SQL schema for the Souk SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id         TEXT PRIMARY KEY,
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,   -- argon2 PHC string
    location        TEXT,
    bio             TEXT,
    skills          TEXT,            -- comma-separated free text
    rating          REAL NOT NULL DEFAULT 0,
    rating_count    INTEGER NOT NULL DEFAULT 0,
    completed_tasks INTEGER NOT NULL DEFAULT 0,
    total_earnings  REAL NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL    -- RFC 3339 UTC; store-assigned
);

CREATE TABLE IF NOT EXISTS listings (
    listing_id   TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL REFERENCES users(user_id),
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    price        REAL NOT NULL,
    category     TEXT NOT NULL,
    condition    TEXT NOT NULL,
    location     TEXT,
    tags         TEXT,               -- comma-separated free text
    availability TEXT NOT NULL,      -- 'rental' | 'barter' | 'both'
    status       TEXT NOT NULL DEFAULT 'available',
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    transaction_id     TEXT PRIMARY KEY,
    listing_id         TEXT NOT NULL REFERENCES listings(listing_id),
    requested_by       TEXT NOT NULL REFERENCES users(user_id),
    kind               TEXT NOT NULL,   -- 'rental' | 'barter'
    status             TEXT NOT NULL DEFAULT 'pending',
    matched_listing_id TEXT REFERENCES listings(listing_id),
    start_date         TEXT,            -- ISO calendar date
    end_date           TEXT,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gigs (
    gig_id        TEXT PRIMARY KEY,
    owner_id      TEXT NOT NULL REFERENCES users(user_id),
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    category      TEXT NOT NULL,
    budget_type   TEXT NOT NULL,       -- 'fixed' | 'hourly'
    budget_amount REAL NOT NULL,
    time_estimate TEXT,
    urgency       TEXT,
    deadline      TEXT,
    location      TEXT,
    status        TEXT NOT NULL DEFAULT 'open',
    created_at    TEXT NOT NULL
);

-- One bid per bidder per gig, enforced at the schema level too.
CREATE TABLE IF NOT EXISTS bids (
    bid_id         TEXT PRIMARY KEY,
    gig_id         TEXT NOT NULL REFERENCES gigs(gig_id),
    bidder_id      TEXT NOT NULL REFERENCES users(user_id),
    amount         REAL NOT NULL,
    estimated_time TEXT,
    proposal       TEXT,
    status         TEXT NOT NULL DEFAULT 'pending',
    created_at     TEXT NOT NULL,
    UNIQUE (gig_id, bidder_id)
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id       TEXT PRIMARY KEY,
    gig_id        TEXT NOT NULL REFERENCES gigs(gig_id),
    bid_id        TEXT NOT NULL REFERENCES bids(bid_id),
    client_id     TEXT NOT NULL REFERENCES users(user_id),
    freelancer_id TEXT NOT NULL REFERENCES users(user_id),
    amount        REAL NOT NULL,
    status        TEXT NOT NULL DEFAULT 'in_progress',
    started_at    TEXT NOT NULL,
    completed_at  TEXT,
    client_rating INTEGER,
    client_review TEXT
);

-- Reviews upsert in place on this key; resubmission never duplicates.
CREATE TABLE IF NOT EXISTS reviews (
    review_id      TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL REFERENCES users(user_id),
    reviewer_id    TEXT NOT NULL REFERENCES users(user_id),
    transaction_id TEXT NOT NULL REFERENCES transactions(transaction_id),
    rating         INTEGER NOT NULL,
    comment        TEXT,
    created_at     TEXT NOT NULL,
    UNIQUE (subject_id, reviewer_id, transaction_id)
);

-- At most one portfolio entry per task; the completion protocol is the only
-- writer.
CREATE TABLE IF NOT EXISTS portfolio (
    entry_id        TEXT PRIMARY KEY,
    freelancer_id   TEXT NOT NULL REFERENCES users(user_id),
    task_id         TEXT NOT NULL REFERENCES tasks(task_id),
    title           TEXT NOT NULL,
    description     TEXT,
    skills_used     TEXT,
    client_feedback TEXT,
    rating          INTEGER NOT NULL,
    completion_date TEXT NOT NULL,
    UNIQUE (task_id)
);

CREATE TABLE IF NOT EXISTS messages (
    message_id  TEXT PRIMARY KEY,
    sender_id   TEXT NOT NULL REFERENCES users(user_id),
    receiver_id TEXT NOT NULL REFERENCES users(user_id),
    task_id     TEXT REFERENCES tasks(task_id),
    body        TEXT NOT NULL,
    is_read     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS listings_owner_idx      ON listings(owner_id);
CREATE INDEX IF NOT EXISTS listings_status_idx     ON listings(status);
CREATE INDEX IF NOT EXISTS transactions_listing_idx ON transactions(listing_id);
CREATE INDEX IF NOT EXISTS bids_gig_idx            ON bids(gig_id);
CREATE INDEX IF NOT EXISTS tasks_client_idx        ON tasks(client_id);
CREATE INDEX IF NOT EXISTS tasks_freelancer_idx    ON tasks(freelancer_id);
CREATE INDEX IF NOT EXISTS reviews_subject_idx     ON reviews(subject_id);
CREATE INDEX IF NOT EXISTS messages_receiver_idx   ON messages(receiver_id);

PRAGMA user_version = 1;
";
