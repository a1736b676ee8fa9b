//! Face identity re-clustering.
//!
//! Destructive by design: every identity cluster is rebuilt from scratch
//! on each run, so cluster membership reflects the full current corpus
//! rather than drifting incrementally. User labels survive through a
//! snapshot taken before the wipe and greedily reattached to the nearest
//! new centroid afterwards. A label can land on a cluster that also
//! attracts another label's faces; the last writer wins, which matches the
//! snapshot-and-reattach scheme's known limit.
//!
//! Everything happens inside one transaction: an error mid-run leaves the
//! previous clustering untouched.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::info;

use crate::cluster::{cluster_embeddings, index_of_closest, mean_embedding, ClusterParams, NOISE};
use crate::config::ClusteringConfig;
use crate::db::{faces, Database};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterReport {
    pub faces: usize,
    pub clusters: usize,
    pub noise: usize,
    pub labels_carried: usize,
}

pub fn recluster_faces(db: &mut Database, config: &ClusteringConfig) -> Result<ClusterReport> {
    let tx = db.conn.transaction()?;

    let labeled = faces::labeled_unique_faces(&tx)?;
    faces::clear_face_links(&tx)?;
    faces::delete_unique_faces(&tx)?;

    let rows = faces::face_embeddings_ordered(&tx)?;
    let embeddings: Vec<Vec<f32>> = rows.iter().map(|(_, e)| e.clone()).collect();

    let params = ClusterParams {
        min_samples: config.min_samples,
        min_cluster_size: config.min_cluster_size,
        epsilon: config.epsilon,
    };
    let labels = cluster_embeddings(&embeddings, &params);

    // Group member indices per cluster, in discovery order.
    let mut members_by_cluster: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    let mut noise = 0;
    for (index, &label) in labels.iter().enumerate() {
        if label == NOISE {
            noise += 1;
        } else {
            members_by_cluster.entry(label).or_default().push(index);
        }
    }

    // Materialize clusters with mean-of-member centroids.
    let mut new_ids = Vec::with_capacity(members_by_cluster.len());
    let mut new_centroids = Vec::with_capacity(members_by_cluster.len());
    for members in members_by_cluster.values() {
        let member_embeddings: Vec<&[f32]> =
            members.iter().map(|&i| embeddings[i].as_slice()).collect();
        let centroid = mean_embedding(&member_embeddings);

        let unique_face_id = faces::insert_unique_face(&tx, None, &centroid)?;
        let face_ids: Vec<i64> = members.iter().map(|&i| rows[i].0).collect();
        faces::attach_faces(&tx, unique_face_id, &face_ids)?;

        new_ids.push(unique_face_id);
        new_centroids.push(centroid);
    }

    // Reattach each surviving label to its nearest new centroid.
    let mut labels_carried = 0;
    for snapshot in &labeled {
        if let Some(closest) = index_of_closest(&snapshot.centroid, &new_centroids) {
            faces::set_unique_face_label(&tx, new_ids[closest], &snapshot.label)?;
            labels_carried += 1;
        }
    }

    tx.commit()?;

    let report = ClusterReport {
        faces: rows.len(),
        clusters: new_ids.len(),
        noise,
        labels_carried,
    };
    info!(
        "Reclustered {} faces into {} identities ({} noise, {} labels carried)",
        report.faces, report.clusters, report.noise, report.labels_carried
    );
    Ok(report)
}
