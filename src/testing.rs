//! Fixtures shared by the unit tests: course trees, access tokens and token assertions.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value, json};

use crate::config::JwtConfig;
use crate::keys::{CourseKey, UsageKey};
use crate::model::block::{AssessmentWindow, Block, BlockFields, CourseUpdate, OPEN_ASSESSMENT};
use crate::model::course::{CertificateDefinition, GradingPolicy};
use crate::security::access::{CourseAuthor, MemoryAccessPolicy, authorize};
use crate::security::token::{AccessTokenClaims, AuthenticatedUser, TokenDecoder, TokenError};

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

#[derive(Debug, Clone, Default)]
pub struct OpenResponse {
    pub graded: bool,
    pub submission_start: Option<String>,
    pub submission_due: Option<String>,
    pub rubric_assessments: Vec<AssessmentWindow>,
}

#[derive(Debug, Clone)]
pub struct AssignmentSpec {
    id: String,
    due: Option<DateTime<Utc>>,
    staff_only: bool,
    open_responses: Vec<OpenResponse>,
}

impl AssignmentSpec {
    pub fn due(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.due = Some(at);
        self
    }

    pub fn staff_only(&mut self) -> &mut Self {
        self.staff_only = true;
        self
    }

    pub fn open_response(&mut self, ora: OpenResponse) -> &mut Self {
        self.open_responses.push(ora);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SectionSpec {
    id: String,
    staff_only: bool,
    hidden: bool,
    assignments: Vec<AssignmentSpec>,
}

impl SectionSpec {
    pub fn staff_only(&mut self) -> &mut Self {
        self.staff_only = true;
        self
    }

    pub fn hidden(&mut self) -> &mut Self {
        self.hidden = true;
        self
    }

    pub fn assignment(&mut self, id: &str) -> &mut AssignmentSpec {
        self.assignments.push(AssignmentSpec {
            id: id.to_owned(),
            due: None,
            staff_only: false,
            open_responses: vec![],
        });
        let last = self.assignments.len() - 1;
        &mut self.assignments[last]
    }
}

/// Builds a course tree: course -> sections (`chapter`) -> assignments (`sequential`)
/// -> one unit (`vertical`) -> an `html` component plus any open responses.
#[derive(Debug, Clone)]
pub struct CourseBuilder {
    key: CourseKey,
    start: Option<DateTime<Utc>>,
    start_is_default: bool,
    end: Option<DateTime<Utc>>,
    self_paced: bool,
    grading_policy: Option<GradingPolicy>,
    certificates: Vec<CertificateDefinition>,
    updates: Option<Vec<CourseUpdate>>,
    sections: Vec<SectionSpec>,
}

impl CourseBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.parse().unwrap(),
            start: None,
            start_is_default: false,
            end: None,
            self_paced: false,
            grading_policy: None,
            certificates: vec![],
            updates: None,
            sections: vec![],
        }
    }

    pub fn key(&self) -> &CourseKey {
        &self.key
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.start = Some(at);
        self.start_is_default = false;
        self
    }

    pub fn default_start(&mut self) -> &mut Self {
        self.start = Some(utc(2030, 1, 1));
        self.start_is_default = true;
        self
    }

    pub fn end(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.end = Some(at);
        self
    }

    pub fn self_paced(&mut self) -> &mut Self {
        self.self_paced = true;
        self
    }

    pub fn grading_policy(&mut self, policy: GradingPolicy) -> &mut Self {
        self.grading_policy = Some(policy);
        self
    }

    pub fn certificate(&mut self, certificate: CertificateDefinition) -> &mut Self {
        self.certificates.push(certificate);
        self
    }

    pub fn updates(&mut self, updates: Vec<CourseUpdate>) -> &mut Self {
        self.updates = Some(updates);
        self
    }

    pub fn section(&mut self, id: &str) -> &mut SectionSpec {
        self.sections.push(SectionSpec {
            id: id.to_owned(),
            staff_only: false,
            hidden: false,
            assignments: vec![],
        });
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn assignment_key(&self, id: &str) -> UsageKey {
        self.key.make_usage_key("sequential", id)
    }

    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = vec![];
        let block = |location: UsageKey, fields: BlockFields, children: Vec<UsageKey>| Block {
            location,
            fields,
            children,
        };

        blocks.push(block(
            self.key.course_usage_key(),
            BlockFields {
                display_name: Some("Demo Course".into()),
                start: self.start,
                start_is_default: self.start_is_default,
                end: self.end,
                self_paced: self.self_paced,
                grading_policy: self.grading_policy.clone(),
                certificates: self.certificates.clone(),
                ..Default::default()
            },
            self.sections
                .iter()
                .map(|s| self.key.make_usage_key("chapter", &s.id))
                .collect(),
        ));

        for section in &self.sections {
            blocks.push(block(
                self.key.make_usage_key("chapter", &section.id),
                BlockFields {
                    display_name: Some(format!("Section {}", section.id)),
                    visible_to_staff_only: section.staff_only,
                    hide_from_toc: section.hidden,
                    ..Default::default()
                },
                section
                    .assignments
                    .iter()
                    .map(|a| self.assignment_key(&a.id))
                    .collect(),
            ));

            for assignment in &section.assignments {
                let unit = self.key.make_usage_key("vertical", &format!("{}_unit", assignment.id));
                blocks.push(block(
                    self.assignment_key(&assignment.id),
                    BlockFields {
                        display_name: Some(format!("Assignment {}", assignment.id)),
                        visible_to_staff_only: assignment.staff_only,
                        due: assignment.due,
                        graded: true,
                        ..Default::default()
                    },
                    vec![unit.clone()],
                ));

                let html = self.key.make_usage_key("html", &format!("{}_intro", assignment.id));
                let mut components = vec![html.clone()];
                blocks.push(block(html, BlockFields::default(), vec![]));

                for (n, ora) in assignment.open_responses.iter().enumerate() {
                    let location = self
                        .key
                        .make_usage_key(OPEN_ASSESSMENT, &format!("{}_ora{n}", assignment.id));
                    components.push(location.clone());
                    blocks.push(block(
                        location,
                        BlockFields {
                            graded: ora.graded,
                            submission_start: ora.submission_start.clone(),
                            submission_due: ora.submission_due.clone(),
                            rubric_assessments: ora.rubric_assessments.clone(),
                            ..Default::default()
                        },
                        vec![],
                    ));
                }

                blocks.push(block(unit, BlockFields::default(), components));
            }
        }

        if let Some(updates) = &self.updates {
            blocks.push(block(
                self.key.updates_usage_key(),
                BlockFields {
                    items: updates.clone(),
                    ..Default::default()
                },
                vec![],
            ));
        }

        blocks
    }
}

/// A global staff author for `course`, which passes the access check without any role.
pub async fn author_for(course: &CourseKey) -> CourseAuthor {
    let user = AuthenticatedUser {
        username: "staff".into(),
        anonymous_id: "anon-staff".into(),
        is_staff: true,
    };
    authorize(&MemoryAccessPolicy::new(vec![]), user, course.clone())
        .await
        .unwrap()
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret_key: "test-secret-key".into(),
        algorithm: "HS256".into(),
        issuer: "https://lms.example.com/oauth2".into(),
        audience: "lms-key".into(),
        supported_version: "1.2.0".into(),
    }
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: Option<String>,
    pub is_staff: bool,
}

impl TestUser {
    pub fn learner(username: &str) -> Self {
        Self {
            username: username.into(),
            email: format!("{username}@example.com"),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            full_name: Some("Ada Lovelace".into()),
            is_staff: false,
        }
    }

    pub fn staff(username: &str) -> Self {
        Self {
            is_staff: true,
            full_name: None,
            ..Self::learner(username)
        }
    }

    pub fn anonymous_id(&self) -> String {
        format!("anon-{}", self.username)
    }
}

pub fn issue_token(
    config: &JwtConfig,
    user: &TestUser,
    scopes: &[&str],
    expires_in: i64,
) -> String {
    issue_token_with(config, user, scopes, expires_in, Map::new())
}

/// Signs a token for `user`. Profile and email claims follow the granted scopes, and
/// `extra` claims are added last.
pub fn issue_token_with(
    config: &JwtConfig,
    user: &TestUser,
    scopes: &[&str],
    expires_in: i64,
    extra: Map<String, Value>,
) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "aud": config.audience,
        "iss": config.issuer,
        "iat": now,
        "exp": now + expires_in,
        "sub": user.anonymous_id(),
        "preferred_username": user.username,
        "scopes": scopes,
        "version": config.supported_version,
    });

    let payload = claims.as_object_mut().unwrap();
    if scopes.contains(&"email") {
        payload.insert("email".into(), json!(user.email));
    }
    if scopes.contains(&"profile") {
        payload.insert("name".into(), json!(user.full_name));
        payload.insert("administrator".into(), json!(user.is_staff));
        payload.insert("family_name".into(), json!(user.last_name));
        payload.insert("given_name".into(), json!(user.first_name));
    }
    payload.extend(extra);

    let algorithm: Algorithm = config.algorithm.parse().unwrap();
    jsonwebtoken::encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .unwrap()
}

#[derive(Debug, Clone, Default)]
pub struct TokenExpectations {
    pub scopes: Vec<String>,
    pub should_be_expired: bool,
    pub filters: Option<Vec<String>>,
    pub should_be_restricted: Option<bool>,
}

/// Asserts that `token` is a valid access token for `user` and returns its claims.
///
/// When the token is expected to have expired, the claims are first read without the
/// expiry check so they can still be compared. Then a decode with the expiry check must
/// fail.
pub fn assert_valid_jwt_access_token(
    config: &JwtConfig,
    token: &str,
    user: &TestUser,
    expectations: TokenExpectations,
) -> AccessTokenClaims {
    let decoder = TokenDecoder::new(config).unwrap();
    let verify_expiration = !expectations.should_be_expired;

    let payload: Map<String, Value> = decoder
        .decode(token, verify_expiration)
        .unwrap_or_else(|e| panic!("token did not decode: {e}"));

    let mut expected = json!({
        "aud": config.audience,
        "iss": config.issuer,
        "preferred_username": user.username,
        "scopes": expectations.scopes,
        "version": config.supported_version,
        "sub": user.anonymous_id(),
    });
    let expected_claims = expected.as_object_mut().unwrap();

    if expectations.scopes.iter().any(|s| s == "email") {
        expected_claims.insert("email".into(), json!(user.email));
    }
    if expectations.scopes.iter().any(|s| s == "profile") {
        expected_claims.insert("name".into(), json!(user.full_name));
        expected_claims.insert("administrator".into(), json!(user.is_staff));
        expected_claims.insert("family_name".into(), json!(user.last_name));
        expected_claims.insert("given_name".into(), json!(user.first_name));
    }
    if let Some(filters) = &expectations.filters {
        expected_claims.insert("filters".into(), json!(filters));
    }
    if let Some(restricted) = expectations.should_be_restricted {
        expected_claims.insert("is_restricted".into(), json!(restricted));
    }

    for (claim, value) in expected_claims.iter() {
        assert_eq!(
            payload.get(claim),
            Some(value),
            "claim {claim} does not match"
        );
    }

    if expectations.should_be_expired {
        assert!(
            matches!(decoder.decode_claims(token, true), Err(TokenError::Expired)),
            "token was expected to have expired"
        );
    }

    decoder.decode_claims(token, verify_expiration).unwrap()
}
