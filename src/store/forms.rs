//! Form and field persistence
//!
//! Field writes go through a transaction so a form never commits with a
//! partial field set. JSON-valued columns (options, validation) are stored
//! as serialized TEXT.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    find_duplicate_key, CreateFormRequest, FieldSpec, Form, FormField, UpdateFormRequest,
};

use super::users::parse_uuid;
use super::{is_unique_violation, Store};

impl Store {
    pub async fn create_form(&self, req: CreateFormRequest) -> Result<Form> {
        if let Some(key) = find_duplicate_key(&req.fields) {
            return Err(AppError::Validation(format!(
                "Field keys must be unique: {}",
                key
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO forms (id, name, description, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.description)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(AppError::Conflict(
                    "Form with this name already exists".to_string(),
                ));
            }
            return Err(err.into());
        }

        insert_fields(&mut tx, id, &req.fields).await?;

        tx.commit().await?;

        tracing::info!(form_id = %id, fields = req.fields.len(), "Form created");

        Ok(Form {
            id,
            name: req.name,
            description: req.description,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn get_form(&self, id: Uuid) -> Result<(Form, Vec<FormField>)> {
        let row = sqlx::query_as::<_, FormRow>(
            "SELECT id, name, description, is_active, created_at FROM forms WHERE id = ? AND is_active = 1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;

        let form: Form = row.try_into()?;
        let fields = self.form_fields(id).await?;
        Ok((form, fields))
    }

    pub async fn list_forms(&self) -> Result<Vec<Form>> {
        let rows = sqlx::query_as::<_, FormRow>(
            "SELECT id, name, description, is_active, created_at FROM forms WHERE is_active = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Replace-all update: supplied fields become the form's entire set.
    pub async fn update_form(&self, id: Uuid, req: UpdateFormRequest) -> Result<(Form, Vec<FormField>)> {
        if let Some(key) = find_duplicate_key(&req.fields) {
            return Err(AppError::Validation(format!(
                "Field keys must be unique: {}",
                key
            )));
        }

        let (mut form, _) = self.get_form(id).await?;
        if let Some(name) = req.name {
            form.name = name;
        }
        if let Some(description) = req.description {
            form.description = Some(description);
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE forms SET name = ?, description = ? WHERE id = ?")
            .bind(&form.name)
            .bind(&form.description)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await;

        if let Err(err) = updated {
            if is_unique_violation(&err) {
                return Err(AppError::Conflict(
                    "Form with this name already exists".to_string(),
                ));
            }
            return Err(err.into());
        }

        sqlx::query("DELETE FROM form_fields WHERE form_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        insert_fields(&mut tx, id, &req.fields).await?;

        tx.commit().await?;

        let fields = self.form_fields(id).await?;
        Ok((form, fields))
    }

    pub(crate) async fn form_fields(&self, form_id: Uuid) -> Result<Vec<FormField>> {
        let rows = sqlx::query_as::<_, FieldRow>(
            r#"
            SELECT id, form_id, label, field_key, field_type, is_required,
                   order_index, options, validation
            FROM form_fields
            WHERE form_id = ?
            ORDER BY order_index, field_key
            "#,
        )
        .bind(form_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

async fn insert_fields(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    form_id: Uuid,
    fields: &[FieldSpec],
) -> Result<()> {
    for (idx, field) in fields.iter().enumerate() {
        let options = field
            .options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Validation(format!("Invalid field options: {}", e)))?;
        let validation = field
            .validation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Validation(format!("Invalid field validation: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO form_fields
                (id, form_id, label, field_key, field_type, is_required,
                 order_index, options, validation)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(form_id.to_string())
        .bind(&field.label)
        .bind(&field.field_key)
        .bind(&field.field_type)
        .bind(field.is_required)
        .bind(field.effective_order(idx))
        .bind(options)
        .bind(validation)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct FormRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<FormRow> for Form {
    type Error = AppError;

    fn try_from(row: FormRow) -> Result<Self> {
        Ok(Form {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FieldRow {
    id: String,
    form_id: String,
    label: String,
    field_key: String,
    field_type: String,
    is_required: bool,
    order_index: i64,
    options: Option<String>,
    validation: Option<String>,
}

impl TryFrom<FieldRow> for FormField {
    type Error = AppError;

    fn try_from(row: FieldRow) -> Result<Self> {
        let options = row
            .options
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Validation(format!("Corrupt field options: {}", e)))?;
        let validation = row
            .validation
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Validation(format!("Corrupt field validation: {}", e)))?;

        Ok(FormField {
            id: parse_uuid(&row.id)?,
            form_id: parse_uuid(&row.form_id)?,
            label: row.label,
            field_key: row.field_key,
            field_type: row.field_type,
            is_required: row.is_required,
            order_index: row.order_index,
            options,
            validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::setup_test_store;

    fn spec(key: &str, required: bool) -> FieldSpec {
        FieldSpec {
            label: key.to_uppercase(),
            field_key: key.to_string(),
            field_type: "TEXT".to_string(),
            is_required: required,
            order_index: 0,
            options: None,
            validation: None,
        }
    }

    fn form_req(name: &str, fields: Vec<FieldSpec>) -> CreateFormRequest {
        CreateFormRequest {
            name: name.to_string(),
            description: None,
            fields,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_form() {
        let store = setup_test_store().await;
        let form = store
            .create_form(form_req(
                "Peer Award",
                vec![spec("impact", true), spec("teamwork", false)],
            ))
            .await
            .unwrap();

        let (fetched, fields) = store.get_form(form.id).await.unwrap();
        assert_eq!(fetched.name, "Peer Award");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_key, "impact");
        assert!(fields[0].is_required);
        assert_eq!(fields[1].order_index, 1);
    }

    #[tokio::test]
    async fn test_create_form_duplicate_name() {
        let store = setup_test_store().await;
        store
            .create_form(form_req("Peer Award", vec![spec("impact", true)]))
            .await
            .unwrap();

        let result = store
            .create_form(form_req("Peer Award", vec![spec("impact", true)]))
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_form_duplicate_field_key() {
        let store = setup_test_store().await;
        let result = store
            .create_form(form_req(
                "Peer Award",
                vec![spec("impact", true), spec("impact", false)],
            ))
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_form_replaces_fields() {
        let store = setup_test_store().await;
        let form = store
            .create_form(form_req(
                "Peer Award",
                vec![spec("impact", true), spec("teamwork", false)],
            ))
            .await
            .unwrap();

        let (updated, fields) = store
            .update_form(
                form.id,
                UpdateFormRequest {
                    name: Some("Team Award".to_string()),
                    description: None,
                    fields: vec![spec("leadership", true)],
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Team Award");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_key, "leadership");
    }

    #[tokio::test]
    async fn test_get_form_not_found() {
        let store = setup_test_store().await;
        let result = store.get_form(Uuid::new_v4()).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_field_options_round_trip() {
        let store = setup_test_store().await;
        let mut field = spec("rating", true);
        field.field_type = "SELECT".to_string();
        field.options = Some(serde_json::json!(["1", "2", "3"]));
        let form = store
            .create_form(form_req("Rated", vec![field]))
            .await
            .unwrap();

        let (_, fields) = store.get_form(form.id).await.unwrap();
        assert_eq!(fields[0].options, Some(serde_json::json!(["1", "2", "3"])));
    }
}
