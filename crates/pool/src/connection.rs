//! Leased connections restricted to the prepared-statement protocol.
//!
//! The MariaDB driver always advertises multi-statement support, so stacked
//! statements (`SELECT 1; DROP TABLE t`) would run whenever SQL text is sent
//! without arguments. [`HardenedConnection`] only lets queries through that
//! carry an argument set, which sends them through `COM_STMT_PREPARE`; the
//! server parses exactly one statement there. Plain `&str` and `raw_sql`
//! queries fail before anything is written to the socket.

use std::fmt;
use std::ops::DerefMut;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use sqlx::error::BoxDynError;
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnection, MySqlQueryResult, MySqlRow, MySqlStatement,
    MySqlTypeInfo,
};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Describe, Either, Execute, Executor, Transaction};

use crate::error::PoolResult;

/// A pooled connection that refuses text-protocol (multi-statement) queries.
///
/// Use it as an executor: `sqlx::query("...").fetch_one(&mut conn)`.
/// Dropping it returns the connection to the pool.
#[derive(Debug)]
pub struct HardenedConnection<C = PoolConnection<MySql>>(C);

/// A transaction on a [`HardenedConnection`], with the same restriction.
///
/// Rolled back on drop unless committed.
pub type HardenedTransaction<'c> = HardenedConnection<Transaction<'c, MySql>>;

impl HardenedConnection<PoolConnection<MySql>> {
    pub(crate) fn new(conn: PoolConnection<MySql>) -> Self {
        Self(conn)
    }

    pub async fn begin(&mut self) -> PoolResult<HardenedTransaction<'_>> {
        let tx = Connection::begin(&mut *self.0).await?;
        Ok(HardenedConnection(tx))
    }

    /// Close the underlying connection instead of returning it to the pool.
    pub async fn close(self) -> PoolResult<()> {
        self.0.close().await?;
        Ok(())
    }
}

impl HardenedTransaction<'_> {
    pub async fn commit(self) -> PoolResult<()> {
        self.0.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> PoolResult<()> {
        self.0.rollback().await?;
        Ok(())
    }
}

impl<C> HardenedConnection<C>
where
    C: DerefMut<Target = MySqlConnection>,
{
    /// Check the connection is still alive.
    pub async fn ping(&mut self) -> PoolResult<()> {
        self.0.ping().await?;
        Ok(())
    }
}

impl<'c, C> Executor<'c> for &'c mut HardenedConnection<C>
where
    C: DerefMut<Target = MySqlConnection> + Send + fmt::Debug,
{
    type Database = MySql;

    fn fetch_many<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> BoxStream<'e, Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>>
    where
        'c: 'e,
        E: 'q + Execute<'q, MySql>,
    {
        (&mut *self.0).fetch_many(PreparedOnly(query))
    }

    fn fetch_optional<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> BoxFuture<'e, Result<Option<MySqlRow>, sqlx::Error>>
    where
        'c: 'e,
        E: 'q + Execute<'q, MySql>,
    {
        (&mut *self.0).fetch_optional(PreparedOnly(query))
    }

    fn prepare_with<'e, 'q: 'e>(
        self,
        sql: &'q str,
        parameters: &'e [MySqlTypeInfo],
    ) -> BoxFuture<'e, Result<MySqlStatement<'q>, sqlx::Error>>
    where
        'c: 'e,
    {
        (&mut *self.0).prepare_with(sql, parameters)
    }

    fn describe<'e, 'q: 'e>(self, sql: &'q str) -> BoxFuture<'e, Result<Describe<MySql>, sqlx::Error>>
    where
        'c: 'e,
    {
        (&mut *self.0).describe(sql)
    }
}

/// Error raised for a query that would use the text protocol.
#[derive(Debug)]
pub struct MultiStatementsDisabled;

impl fmt::Display for MultiStatementsDisabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "text protocol queries are disabled (allowMultiQueries=false); use sqlx::query"
        )
    }
}

impl std::error::Error for MultiStatementsDisabled {}

/// Wraps a query and fails it if it carries no argument set.
struct PreparedOnly<E>(E);

impl<'q, E> Execute<'q, MySql> for PreparedOnly<E>
where
    E: Execute<'q, MySql>,
{
    fn sql(&self) -> &'q str {
        self.0.sql()
    }

    fn statement(&self) -> Option<&MySqlStatement<'q>> {
        self.0.statement()
    }

    fn take_arguments(&mut self) -> Result<Option<MySqlArguments>, BoxDynError> {
        match self.0.take_arguments()? {
            Some(arguments) => Ok(Some(arguments)),
            None => Err(Box::new(MultiStatementsDisabled)),
        }
    }

    fn persistent(&self) -> bool {
        self.0.persistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_rejected() {
        let mut query = PreparedOnly("SELECT 1; DROP TABLE users");
        let err = Execute::<MySql>::take_arguments(&mut query).unwrap_err();
        assert!(err.is::<MultiStatementsDisabled>());
    }

    #[test]
    fn test_raw_sql_rejected() {
        let mut query = PreparedOnly(sqlx::raw_sql("SELECT 1; SELECT 2"));
        let err = Execute::<MySql>::take_arguments(&mut query).unwrap_err();
        assert!(err.is::<MultiStatementsDisabled>());
    }

    #[test]
    fn test_prepared_query_passes() {
        let mut query = PreparedOnly(sqlx::query::<MySql>("SELECT ?").bind(1_i64));
        assert_eq!(query.sql(), "SELECT ?");
        assert!(query.take_arguments().unwrap().is_some());

        // no binds still carries an (empty) argument set
        let mut query = PreparedOnly(sqlx::query::<MySql>("SELECT 1"));
        assert!(query.take_arguments().unwrap().is_some());
    }
}
