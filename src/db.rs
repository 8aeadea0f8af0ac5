//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create tables if not exist
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    // Idempotent default template catalog
    sqlx::query(SEED_TEMPLATES_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Client organizations (Multi-tenant)
CREATE TABLE IF NOT EXISTS organizations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    domain VARCHAR(255),
    risk_score INT,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);

-- Employee directory (one row per org member, upsert-keyed on org+email)
CREATE TABLE IF NOT EXISTS employees (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL,
    display_name VARCHAR(255),
    position VARCHAR(255),
    risk_level VARCHAR(20) NOT NULL DEFAULT 'unknown',
    times_compromised INT NOT NULL DEFAULT 0,
    total_leaks INT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW(),
    UNIQUE (organization_id, email)
);

-- Lure template catalog (data table, not compiled-in constants)
CREATE TABLE IF NOT EXISTS email_templates (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    slug VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    subject VARCHAR(500) NOT NULL,
    from_name VARCHAR(255) NOT NULL,
    from_email VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    html_content TEXT NOT NULL,
    difficulty_level VARCHAR(20) DEFAULT 'medium',
    created_at TIMESTAMPTZ DEFAULT NOW()
);

-- Bulk simulation campaigns (org nullable: cross-tenant campaigns allowed)
CREATE TABLE IF NOT EXISTS campaigns (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    template_slug VARCHAR(255) NOT NULL,
    organization_id UUID REFERENCES organizations(id),
    status VARCHAR(20) NOT NULL DEFAULT 'sending',
    created_at TIMESTAMPTZ DEFAULT NOW()
);

-- Per-recipient tracking rows; (campaign_id, email) is the click-attribution key
CREATE TABLE IF NOT EXISTS campaign_targets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    campaign_id UUID NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    sent_at TIMESTAMPTZ,
    clicked_at TIMESTAMPTZ,
    UNIQUE (campaign_id, email)
);

-- Lightweight click log for campaign-less quick attacks
CREATE TABLE IF NOT EXISTS simulation_clicks (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL,
    template_slug VARCHAR(255) NOT NULL,
    user_agent TEXT,
    clicked_at TIMESTAMPTZ DEFAULT NOW()
);

-- Credential leak records from the breach feed
CREATE TABLE IF NOT EXISTS employee_leaks (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    employee_id UUID NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    source VARCHAR(255) NOT NULL,
    data_classes JSONB,
    leaked_at DATE,
    detected_at TIMESTAMPTZ DEFAULT NOW()
);

-- Compliance audit results (append-only, history kept for trends)
CREATE TABLE IF NOT EXISTS control_results (
    id BIGSERIAL PRIMARY KEY,
    organization_id UUID NOT NULL,
    control_id VARCHAR(100) NOT NULL,
    control_name VARCHAR(255) NOT NULL,
    status VARCHAR(10) NOT NULL,
    score INT NOT NULL,
    evidence JSONB,
    scanned_at TIMESTAMPTZ DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_employees_org ON employees(organization_id);
CREATE INDEX IF NOT EXISTS idx_campaigns_org ON campaigns(organization_id);
CREATE INDEX IF NOT EXISTS idx_targets_campaign ON campaign_targets(campaign_id);
CREATE INDEX IF NOT EXISTS idx_targets_status ON campaign_targets(status);
CREATE INDEX IF NOT EXISTS idx_clicks_email ON simulation_clicks(email);
CREATE INDEX IF NOT EXISTS idx_leaks_employee ON employee_leaks(employee_id);
CREATE INDEX IF NOT EXISTS idx_controls_org ON control_results(organization_id, scanned_at);
"#;

/// Starter lure templates. `{{link}}` is replaced per recipient at dispatch.
const SEED_TEMPLATES_SQL: &str = r#"
INSERT INTO email_templates (slug, name, subject, from_name, from_email, category, html_content, difficulty_level)
VALUES
    (
        'google-security',
        'Google Workspace Alert',
        'Security alert: new sign-in detected',
        'Kinetis Security',
        'security@kinetis.org',
        'credentials',
        '<div style="font-family: Arial, sans-serif; padding: 20px;"><h2 style="color: #d93025;">Google Workspace Alert</h2><p>We detected an unusual sign-in on your corporate account.</p><p><strong>Device:</strong> iPhone 14 Pro<br><strong>Location:</strong> Lagos, Nigeria</p><p>If this was not you, block access immediately:</p><a href="{{link}}" style="background-color: #d93025; color: white; padding: 10px 20px; text-decoration: none; border-radius: 4px;">Block access and change password</a></div>',
        'medium'
    ),
    (
        'hr-payroll',
        'HR Payroll Update',
        'Action required: confirm your payroll details',
        'Human Resources',
        'security@kinetis.org',
        'hr',
        '<div style="font-family: Arial, sans-serif; padding: 20px;"><h2>Payroll system migration</h2><p>We are migrating payroll providers this month. Confirm your deposit details before the cutoff to avoid a delayed payment.</p><a href="{{link}}" style="background-color: #1a73e8; color: white; padding: 10px 20px; text-decoration: none; border-radius: 4px;">Confirm payroll details</a></div>',
        'hard'
    )
ON CONFLICT (slug) DO NOTHING;
"#;
