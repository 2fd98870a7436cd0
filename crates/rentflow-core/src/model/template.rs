use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_api::{TemplateRequest, TemplateResponse};

use super::EntityId;

/// A document template owned by the mutation service's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: EntityId,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub context_requirements: Vec<String>,
    pub user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Template {
    /// Build the placeholder record inserted before the server answers.
    pub(crate) fn optimistic(id: EntityId, patch: &TemplatePatch) -> Self {
        let now = Utc::now();
        let mut template = Self {
            id,
            title: String::new(),
            content: String::new(),
            category: None,
            context_requirements: Vec::new(),
            user_id: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        template.apply(patch);
        template
    }

    /// Overwrite every field the patch carries.
    pub fn apply(&mut self, patch: &TemplatePatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(reqs) = &patch.context_requirements {
            self.context_requirements.clone_from(reqs);
        }
        self.updated_at = Some(Utc::now());
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.is_temporary()
    }
}

impl From<TemplateResponse> for Template {
    fn from(r: TemplateResponse) -> Self {
        Self {
            id: EntityId::from(r.id),
            title: r.title,
            content: r.content,
            category: r.category,
            context_requirements: r.context_requirements,
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Field changes for create and update. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub context_requirements: Option<Vec<String>>,
}

impl TemplatePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.context_requirements.is_none()
    }
}

impl From<&TemplatePatch> for TemplateRequest {
    fn from(p: &TemplatePatch) -> Self {
        Self {
            title: p.title.clone(),
            content: p.content.clone(),
            category: p.category.clone(),
            context_requirements: p.context_requirements.clone(),
        }
    }
}

impl From<TemplateRequest> for TemplatePatch {
    fn from(r: TemplateRequest) -> Self {
        Self {
            title: r.title,
            content: r.content,
            category: r.category,
            context_requirements: r.context_requirements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn patch_only_touches_present_fields() {
        let mut t = Template::optimistic(
            EntityId::temporary(),
            &TemplatePatch {
                title: Some("Kündigung".into()),
                content: Some("<p>a</p>".into()),
                ..TemplatePatch::default()
            },
        );
        t.apply(&TemplatePatch {
            content: Some("<p>b</p>".into()),
            ..TemplatePatch::default()
        });
        assert_eq!(t.title, "Kündigung");
        assert_eq!(t.content, "<p>b</p>");
        assert!(t.is_optimistic());
    }

    #[test]
    fn response_converts_with_server_id() {
        let t = Template::from(TemplateResponse {
            id: "srv-1".into(),
            title: "Mahnung".into(),
            content: String::new(),
            category: None,
            context_requirements: vec![],
            user_id: None,
            created_at: None,
            updated_at: None,
        });
        assert_eq!(t.id, EntityId::from("srv-1"));
        assert!(!t.is_optimistic());
    }

    #[test]
    fn patch_to_request_keeps_absent_fields_absent() {
        let req = TemplateRequest::from(&TemplatePatch {
            category: Some("Mietvertrag".into()),
            ..TemplatePatch::default()
        });
        assert_eq!(req.title, None);
        assert_eq!(req.category.as_deref(), Some("Mietvertrag"));
        assert!(TemplatePatch::default().is_empty());
    }
}
