//! SurrealDB implementation of [`AccessPointRepository`].
//!
//! A reference's access points are stored with their position in the set
//! last written, and always read back in that order.

use keel_core::error::KeelResult;
use keel_core::models::access_point::{AccessPoint, AccessPointTarget, NewAccessPoint};
use keel_core::models::reference::Reference;
use keel_core::new_id;
use keel_core::repository::AccessPointRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::{DbError, parse_column};

const SELECT_ACCESS_POINT: &str = "SELECT meta::id(id) AS record_id, * FROM access_point";

#[derive(Debug, SurrealValue)]
struct AccessPointRow {
    record_id: String,
    reference_type: String,
    reference_id: String,
    target: String,
    host: String,
    secured: bool,
    overriding: bool,
}

impl AccessPointRow {
    fn try_into_access_point(self) -> Result<AccessPoint, DbError> {
        Ok(AccessPoint {
            id: self.record_id,
            reference: Reference::new(
                parse_column("access_point.reference_type", &self.reference_type)?,
                self.reference_id,
            ),
            target: parse_column("access_point.target", &self.target)?,
            host: self.host,
            secured: self.secured,
            overriding: self.overriding,
        })
    }
}

fn into_access_points(rows: Vec<AccessPointRow>) -> Result<Vec<AccessPoint>, DbError> {
    rows.into_iter()
        .map(AccessPointRow::try_into_access_point)
        .collect()
}

#[derive(Clone)]
pub struct SurrealAccessPointRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccessPointRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AccessPointRepository for SurrealAccessPointRepository<C> {
    async fn find_by_reference(&self, reference: &Reference) -> KeelResult<Vec<AccessPoint>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_ACCESS_POINT} WHERE reference_type = $reference_type \
                 AND reference_id = $reference_id ORDER BY position ASC"
            ))
            .bind(("reference_type", reference.reference_type.as_str()))
            .bind(("reference_id", reference.reference_id.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccessPointRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_access_points(rows)?)
    }

    async fn find_by_reference_and_target(
        &self,
        reference: &Reference,
        target: AccessPointTarget,
    ) -> KeelResult<Vec<AccessPoint>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_ACCESS_POINT} WHERE reference_type = $reference_type \
                 AND reference_id = $reference_id AND target = $target \
                 ORDER BY position ASC"
            ))
            .bind(("reference_type", reference.reference_type.as_str()))
            .bind(("reference_id", reference.reference_id.clone()))
            .bind(("target", target.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccessPointRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_access_points(rows)?)
    }

    async fn find_by_host(&self, host: &str) -> KeelResult<Option<AccessPoint>> {
        let mut result = self
            .db
            .query(format!("{SELECT_ACCESS_POINT} WHERE host = $host LIMIT 1"))
            .bind(("host", host.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccessPointRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_access_point()?)),
            None => Ok(None),
        }
    }

    async fn replace(
        &self,
        reference: &Reference,
        access_points: Vec<NewAccessPoint>,
    ) -> KeelResult<Vec<AccessPoint>> {
        self.delete_by_reference(reference).await?;

        for (position, access_point) in access_points.into_iter().enumerate() {
            let result = self
                .db
                .query(
                    "CREATE type::record('access_point', $id) SET \
                     reference_type = $reference_type, reference_id = $reference_id, \
                     target = $target, host = $host, secured = $secured, \
                     overriding = $overriding, position = $position RETURN NONE",
                )
                .bind(("id", new_id()))
                .bind(("reference_type", reference.reference_type.as_str()))
                .bind(("reference_id", reference.reference_id.clone()))
                .bind(("target", access_point.target.as_str()))
                .bind(("host", access_point.host))
                .bind(("secured", access_point.secured))
                .bind(("overriding", access_point.overriding))
                .bind(("position", position as i64))
                .await
                .map_err(DbError::from)?;
            result
                .check()
                .map_err(|e| DbError::Migration(e.to_string()))?;
        }

        self.find_by_reference(reference).await
    }

    async fn delete_by_reference(&self, reference: &Reference) -> KeelResult<Vec<String>> {
        let result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM (DELETE access_point \
                 WHERE reference_type = $reference_type AND reference_id = $reference_id \
                 RETURN BEFORE);",
            )
            .bind(("reference_type", reference.reference_type.as_str()))
            .bind(("reference_id", reference.reference_id.clone()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(ids)
    }
}
