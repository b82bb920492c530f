//! Course roster cache

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use openapi_client::{CourseWithUsers, User, UserRole};
use secrecy::SecretString;
use tracing::debug;

use crate::errors::ClientError;
use crate::http::courses::CourseSource;

/// Memoized course rosters and user lookups.
///
/// No eviction: entries live until a course is invalidated or the cache is cleared.
#[derive(Default)]
pub struct RosterCache {
    courses: RwLock<HashMap<String, CourseWithUsers>>,
    users: RwLock<HashMap<String, User>>,
}

impl RosterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a course with its users, fetching it on a miss
    pub async fn course<S: CourseSource + ?Sized>(
        &self,
        source: &S,
        course_id: &str,
        token: &SecretString,
    ) -> Result<CourseWithUsers, ClientError> {
        if let Some(course) = self.cached_course(course_id) {
            return Ok(course);
        }

        debug!("Roster cache miss for course {}", course_id);
        let course = source.fetch_course(course_id, token).await?;
        self.insert_course(course.clone());
        Ok(course)
    }

    /// Students enrolled in any of the given courses, in course order with
    /// duplicates removed
    pub async fn students_for_courses<S: CourseSource + ?Sized>(
        &self,
        source: &S,
        course_ids: &[String],
        token: &SecretString,
    ) -> Result<Vec<User>, ClientError> {
        let mut seen = HashSet::new();
        let mut students = Vec::new();

        for course_id in course_ids {
            let course = self.course(source, course_id, token).await?;
            for user in course.users {
                if is_student(&user) && seen.insert(user.user_id.clone()) {
                    students.push(user);
                }
            }
        }

        Ok(students)
    }

    /// Add a course to the cache and index its users
    pub fn insert_course(&self, course: CourseWithUsers) {
        {
            let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
            for user in &course.users {
                users.insert(user.user_id.clone(), user.clone());
            }
        }
        let mut courses = self.courses.write().unwrap_or_else(|e| e.into_inner());
        courses.insert(course.course.course_id.clone(), course);
    }

    fn cached_course(&self, course_id: &str) -> Option<CourseWithUsers> {
        let courses = self.courses.read().unwrap_or_else(|e| e.into_inner());
        courses.get(course_id).cloned()
    }

    /// Get a cached user
    pub fn user(&self, user_id: &str) -> Option<User> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users.get(user_id).cloned()
    }

    /// Display identity of a user: username, else email
    pub fn display_name(&self, user_id: &str) -> Option<String> {
        self.user(user_id)
            .and_then(|u| u.username.filter(|n| !n.trim().is_empty()).or(u.email))
    }

    /// Drop a course after its roster changed. Users stay indexed since they
    /// may belong to other cached courses.
    pub fn invalidate_course(&self, course_id: &str) {
        let mut courses = self.courses.write().unwrap_or_else(|e| e.into_inner());
        courses.remove(course_id);
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.courses.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.users.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of cached courses
    pub fn len(&self) -> usize {
        self.courses.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_student(user: &User) -> bool {
    !matches!(user.role, Some(UserRole::Teacher | UserRole::Admin))
}
