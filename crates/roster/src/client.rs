//! Client data layer for the resource API.
//!
//! [`StudentClient`] performs the HTTP calls; [`StudentList`] holds the
//! in-memory list the view renders and applies deletes optimistically.

use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::student::{NewStudent, Student, StudentPatch};

/// HTTP client for the `/student` resource.
#[derive(Debug, Clone)]
pub struct StudentClient {
    http: reqwest::Client,
    base_url: Url,
}

impl StudentClient {
    /// Create a client for the API at `base_url` (e.g. `http://localhost:5050`).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid base URL {base_url}: {e}"),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL under the base, one escaped path segment per item.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::internal(format!("base URL cannot have a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self) -> Result<Url> {
        self.url(&["student", ""])
    }

    /// `.` and `..` are dropped by path normalization, so they never name
    /// a record.
    fn member_url(&self, id: &str) -> Result<Url> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(Error::InvalidId(id.to_string()));
        }
        self.url(&["student", id])
    }

    /// Fetch every student, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports one.
    pub async fn list(&self) -> Result<Vec<Student>> {
        let resp = self.http.get(self.collection_url()?).send().await?;
        decode(resp).await
    }

    /// Fetch one student by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with `invalid_id` or `not_found`,
    /// [`Error::InvalidId`] for an id that cannot be a path segment, or a
    /// transport error.
    pub async fn get(&self, id: &str) -> Result<Student> {
        let resp = self
            .http
            .get(self.member_url(id)?)
            .send()
            .await?;
        decode(resp).await
    }

    /// Create a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with `validation_error` or `duplicate_key`,
    /// or a transport error.
    pub async fn create(&self, student: &NewStudent) -> Result<Student> {
        let resp = self
            .http
            .post(self.collection_url()?)
            .json(student)
            .send()
            .await?;
        decode(resp).await
    }

    /// Update the supplied fields of a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any rejected update, or a transport error.
    pub async fn update(&self, id: &str, patch: &StudentPatch) -> Result<Student> {
        let resp = self
            .http
            .patch(self.member_url(id)?)
            .json(patch)
            .send()
            .await?;
        decode(resp).await
    }

    /// Delete a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with `invalid_id` or `not_found`, or a
    /// transport error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.member_url(id)?)
            .send()
            .await?;
        let _: serde_json::Value = decode(resp).await?;
        Ok(())
    }
}

/// Decode a success body, or turn an error status into [`Error::Api`].
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let code = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    Err(Error::Api {
        status: status.as_u16(),
        code,
    })
}

/// In-memory list of students backing the list view.
#[derive(Debug, Clone)]
pub struct StudentList {
    client: StudentClient,
    students: Vec<Student>,
}

impl StudentList {
    /// Create an empty list bound to `client`.
    #[must_use]
    pub fn new(client: StudentClient) -> Self {
        Self {
            client,
            students: Vec::new(),
        }
    }

    /// The current records, in server order.
    #[must_use]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// The client this list talks through.
    #[must_use]
    pub fn client(&self) -> &StudentClient {
        &self.client
    }

    /// Fetch the full list and replace local state.
    ///
    /// A failed fetch is logged and leaves the current state untouched.
    /// Returns whether the fetch succeeded.
    pub async fn load(&mut self) -> bool {
        match self.client.list().await {
            Ok(students) => {
                debug!(count = students.len(), "loaded students");
                self.students = students;
                true
            }
            Err(e) => {
                error!("An error occurred: {e}");
                false
            }
        }
    }

    /// Delete a student, removing it locally whatever the server says.
    ///
    /// Local state may disagree with the store until the next [`load`]
    /// if the server-side delete failed.
    ///
    /// # Errors
    ///
    /// Returns the server or transport error, after local removal.
    ///
    /// [`load`]: Self::load
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let result = self.client.delete(id).await;
        if let Err(e) = &result {
            error!("Delete of {id} failed: {e}");
        }
        self.students.retain(|s| s.id.to_string() != id);
        result
    }
}
