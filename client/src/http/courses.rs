//! Course API client

use async_trait::async_trait;
use openapi_client::{Course, CourseWithUsers};
use secrecy::SecretString;

use crate::errors::ClientError;
use crate::http::client::HttpClient;

/// Read seam used by the roster cache
#[async_trait]
pub trait CourseSource: Send + Sync {
    async fn fetch_course(
        &self,
        course_id: &str,
        token: &SecretString,
    ) -> Result<CourseWithUsers, ClientError>;
}

impl HttpClient {
    /// List courses
    pub async fn list_courses(&self, token: &SecretString) -> Result<Vec<Course>, ClientError> {
        self.get_with_query("/courses", token, &[("skip", "0"), ("limit", "100")])
            .await
    }

    /// Get a course together with its enrolled users
    pub async fn get_course(
        &self,
        course_id: &str,
        token: &SecretString,
    ) -> Result<CourseWithUsers, ClientError> {
        let path = format!("/courses/{}", course_id);
        self.get(&path, token).await
    }
}

#[async_trait]
impl CourseSource for HttpClient {
    async fn fetch_course(
        &self,
        course_id: &str,
        token: &SecretString,
    ) -> Result<CourseWithUsers, ClientError> {
        self.get_course(course_id, token).await
    }
}
