//! Example receiver: organizations and users on Postgres.
//!
//! Every method acquires its own pooled connection and releases it on return.
use crate::migration::{MethodFuture, MethodResult};
use crate::receiver::{MethodTable, Receiver};

use anyhow::Context;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use sqlx::{Executor, PgPool};
use sqlx::pool::PoolConnection;


const ORGANIZATIONS: [(&str, &str, &str); 3] = [
    ("Amazon", "Seattle", "1994-07-05"),
    ("Google", "Mountain View", "1998-09-04"),
    ("JFrog", "Santa Clara", "2008-04-28"),
];

const USERS: [&str; 3] = ["Alex", "Beatrice", "Cleo"];


pub struct SampleMigrator {
    pool: PgPool,
}

impl SampleMigrator {
    pub fn new(pool: PgPool) -> Self {
        SampleMigrator { pool }
    }

    async fn connection(&self) -> anyhow::Result<PoolConnection<sqlx::Postgres>> {
        self.pool.acquire().await.context("Could not open a Postgres connection")
    }

    async fn init_organizations(&self) -> MethodResult {
        let mut conn = self.connection().await?;
        sqlx::query(r#"
            CREATE TABLE organizations (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                date_founded DATE NOT NULL
            );
        "#)
            .execute(&mut *conn)
            .await?;

        for (name, location, founded) in ORGANIZATIONS {
            sqlx::query("INSERT INTO organizations (name, location, date_founded) VALUES ($1, $2, $3::date)")
                .bind(name)
                .bind(location)
                .bind(founded)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    async fn init_users(&self) -> MethodResult {
        let mut conn = self.connection().await?;
        sqlx::query("CREATE TABLE users (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL);")
            .execute(&mut *conn)
            .await?;

        for name in USERS {
            sqlx::query("INSERT INTO users (name) VALUES ($1)")
                .bind(name)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    async fn drop_table(&self, table: &'static str) -> MethodResult {
        let mut conn = self.connection().await?;
        let sql = format!("DROP TABLE {table};");
        (&mut *conn).execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }

    async fn rename_organization_column(&self, from: &'static str, to: &'static str) -> MethodResult {
        let mut conn = self.connection().await?;
        let sql = format!("ALTER TABLE organizations RENAME COLUMN {from} TO {to};");
        (&mut *conn).execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }

    async fn rename_user(&self, from: &'static str, to: &'static str) -> MethodResult {
        let mut conn = self.connection().await?;
        let result = sqlx::query("UPDATE users SET name = $1 WHERE name = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No user named '{from}'");
        }
        Ok(())
    }
}

#[allow(non_snake_case)]
impl SampleMigrator {
    pub fn V001_init_organizations_up(&self) -> MethodFuture<'_> {
        self.init_organizations().boxed()
    }

    pub fn V001_init_organizations_down(&self) -> MethodFuture<'_> {
        self.drop_table("organizations").boxed()
    }

    pub fn V001_init_users_up(&self) -> MethodFuture<'_> {
        self.init_users().boxed()
    }

    pub fn V001_init_users_down(&self) -> MethodFuture<'_> {
        self.drop_table("users").boxed()
    }

    pub fn V002_organizations_rename_location_field_to_headquarters_up(&self) -> MethodFuture<'_> {
        self.rename_organization_column("location", "headquarters").boxed()
    }

    pub fn V002_organizations_rename_location_field_to_headquarters_down(&self) -> MethodFuture<'_> {
        self.rename_organization_column("headquarters", "location").boxed()
    }

    pub fn V002_change_user_cleo_to_cleopatra_up(&self) -> MethodFuture<'_> {
        self.rename_user("Cleo", "Cleopatra").boxed()
    }

    pub fn V002_change_user_cleo_to_cleopatra_down(&self) -> MethodFuture<'_> {
        self.rename_user("Cleopatra", "Cleo").boxed()
    }

    // Convention look-alikes; the scanner skips or rejects these.

    pub fn v001_not_exported_method_up(&self) -> MethodFuture<'_> {
        async { Ok(()) }.boxed()
    }

    pub fn V001_method_with_wrong_signature_up(&self, _label: String) -> MethodFuture<'_> {
        async { Ok(()) }.boxed()
    }

    pub fn V001_method_with_wrong_signature_up2(&self, _pool: PgPool) -> MethodFuture<'_> {
        async { Ok(()) }.boxed()
    }

    pub fn V001_method_with_wrong_signature_down(&self) -> BoxFuture<'_, (bool, MethodResult)> {
        async { (true, Ok(())) }.boxed()
    }
}

impl Receiver for SampleMigrator {
    fn methods() -> MethodTable<Self> {
        crate::methods!(SampleMigrator => [
            V001_init_organizations_up,
            V001_init_organizations_down,
            V001_init_users_up,
            V001_init_users_down,
            V002_organizations_rename_location_field_to_headquarters_up,
            V002_organizations_rename_location_field_to_headquarters_down,
            V002_change_user_cleo_to_cleopatra_up,
            V002_change_user_cleo_to_cleopatra_down,
            v001_not_exported_method_up,
            V001_method_with_wrong_signature_up,
            V001_method_with_wrong_signature_up2,
            V001_method_with_wrong_signature_down,
        ])
    }
}
