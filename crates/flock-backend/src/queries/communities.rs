use std::collections::HashSet;

use flock_types::models::Community;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::Backend;

#[derive(Debug, Deserialize)]
struct Membership {
    #[serde(deserialize_with = "flock_types::models::id_from_string_or_number")]
    community_id: String,
}

impl Backend {
    /// Largest first.
    pub async fn communities(&self) -> Result<Vec<Community>> {
        self.from("communities")
            .select("*")
            .order("member_count", false)
            .fetch()
            .await
    }

    /// Ids of the communities `user_id` belongs to.
    pub async fn memberships(&self, user_id: &str) -> Result<HashSet<String>> {
        let rows: Vec<Membership> = self
            .from("community_members")
            .select("community_id")
            .eq("user_id", user_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(|m| m.community_id).collect())
    }

    pub async fn join_community(&self, user_id: &str, community_id: &str) -> Result<()> {
        self.from("community_members")
            .upsert(
                &json!({ "community_id": community_id, "user_id": user_id }),
                "community_id,user_id",
            )
            .await?;
        info!("User {} joined community {}", user_id, community_id);
        Ok(())
    }

    pub async fn leave_community(&self, user_id: &str, community_id: &str) -> Result<()> {
        self.from("community_members")
            .eq("community_id", community_id)
            .eq("user_id", user_id)
            .delete()
            .await?;
        info!("User {} left community {}", user_id, community_id);
        Ok(())
    }
}

/// Split all communities into `(discover, mine)` and mark membership.
pub fn split_memberships(
    communities: Vec<Community>,
    member_of: &HashSet<String>,
) -> (Vec<Community>, Vec<Community>) {
    communities
        .into_iter()
        .map(|mut c| {
            c.is_member = member_of.contains(&c.id);
            c
        })
        .partition(|c| !c.is_member)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn community(id: &str) -> Community {
        serde_json::from_value(json!({ "id": id, "name": format!("c{id}") })).unwrap()
    }

    #[test]
    fn members_land_in_mine() {
        let joined: HashSet<String> = ["2".to_string()].into_iter().collect();
        let (discover, mine) =
            split_memberships(vec![community("1"), community("2"), community("3")], &joined);

        assert_eq!(discover.len(), 2);
        assert!(discover.iter().all(|c| !c.is_member));
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "2");
        assert!(mine[0].is_member);
    }
}
