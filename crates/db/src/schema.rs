//! Table and index definitions.

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS inscriptions (
    id                 TEXT PRIMARY KEY,
    content_type       TEXT NOT NULL,
    content            BLOB NOT NULL,
    block_height       INTEGER NOT NULL,
    block_hash         TEXT NOT NULL,
    txid               TEXT NOT NULL,
    vout               INTEGER NOT NULL,
    owner              TEXT NOT NULL,
    timestamp          INTEGER NOT NULL,
    inscription_number INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_inscriptions_owner        ON inscriptions(owner);
CREATE INDEX IF NOT EXISTS idx_inscriptions_height       ON inscriptions(block_height);
CREATE INDEX IF NOT EXISTS idx_inscriptions_number       ON inscriptions(inscription_number);
CREATE INDEX IF NOT EXISTS idx_inscriptions_txid         ON inscriptions(txid);
CREATE INDEX IF NOT EXISTS idx_inscriptions_content_type ON inscriptions(content_type);
CREATE INDEX IF NOT EXISTS idx_inscriptions_timestamp    ON inscriptions(timestamp DESC);

CREATE TABLE IF NOT EXISTS burn_claims (
    inscription_id    TEXT PRIMARY KEY,
    collection_name   TEXT NOT NULL,
    token_id          INTEGER NOT NULL,
    sender_address    TEXT NOT NULL,
    burn_txid         TEXT NOT NULL,
    burn_block_height INTEGER NOT NULL,
    burn_block_hash   TEXT NOT NULL,
    status            TEXT NOT NULL,
    attest_txid       TEXT,
    created_at        INTEGER NOT NULL,
    updated_at        INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_burn_claims_status     ON burn_claims(status);
CREATE INDEX IF NOT EXISTS idx_burn_claims_sender     ON burn_claims(sender_address);
CREATE INDEX IF NOT EXISTS idx_burn_claims_collection ON burn_claims(collection_name);
CREATE INDEX IF NOT EXISTS idx_burn_claims_height     ON burn_claims(burn_block_height);
";
