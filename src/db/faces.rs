//! Face and identity-cluster persistence.
//!
//! These operations run inside the re-clustering transaction, so they take
//! a plain connection (a `Transaction` derefs to one).

use anyhow::Result;
use rusqlite::{params, Connection};

use super::{bytes_to_embedding, embedding_to_bytes};

/// One identity cluster as stored.
#[derive(Debug, Clone)]
pub struct UniqueFace {
    pub id: i64,
    pub label: Option<String>,
    pub centroid: Vec<f32>,
}

/// Snapshot of a labeled identity, kept across destructive re-clustering.
#[derive(Debug, Clone)]
pub struct LabeledFace {
    pub label: String,
    pub centroid: Vec<f32>,
}

/// Identities that carry a user label, with their centroids.
pub fn labeled_unique_faces(conn: &Connection) -> Result<Vec<LabeledFace>> {
    let mut stmt = conn.prepare(
        "SELECT label, centroid FROM unique_faces WHERE label IS NOT NULL",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(LabeledFace {
            label: row.get::<_, String>(0)?,
            centroid: bytes_to_embedding(&row.get::<_, Vec<u8>>(1)?),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Detach every face from its identity cluster.
pub fn clear_face_links(conn: &Connection) -> Result<()> {
    conn.execute("UPDATE face_boxes SET unique_face_id = NULL", [])?;
    Ok(())
}

pub fn delete_unique_faces(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM unique_faces", [])?;
    Ok(())
}

/// All face embeddings in a stable id order, so clustering sees the same
/// input sequence for the same corpus.
pub fn face_embeddings_ordered(conn: &Connection) -> Result<Vec<(i64, Vec<f32>)>> {
    let mut stmt = conn.prepare("SELECT id, embedding FROM face_boxes ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            bytes_to_embedding(&row.get::<_, Vec<u8>>(1)?),
        ))
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

pub fn insert_unique_face(
    conn: &Connection,
    label: Option<&str>,
    centroid: &[f32],
) -> Result<i64> {
    conn.execute(
        "INSERT INTO unique_faces (label, centroid) VALUES (?1, ?2)",
        params![label, embedding_to_bytes(centroid)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_unique_face_label(conn: &Connection, id: i64, label: &str) -> Result<()> {
    conn.execute(
        "UPDATE unique_faces SET label = ?1 WHERE id = ?2",
        params![label, id],
    )?;
    Ok(())
}

/// Point a set of faces at their identity cluster.
pub fn attach_faces(conn: &Connection, unique_face_id: i64, face_ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare("UPDATE face_boxes SET unique_face_id = ?1 WHERE id = ?2")?;
    for face_id in face_ids {
        stmt.execute(params![unique_face_id, face_id])?;
    }
    Ok(())
}

pub fn unique_faces(conn: &Connection) -> Result<Vec<UniqueFace>> {
    let mut stmt = conn.prepare("SELECT id, label, centroid FROM unique_faces ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(UniqueFace {
            id: row.get(0)?,
            label: row.get(1)?,
            centroid: bytes_to_embedding(&row.get::<_, Vec<u8>>(2)?),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Cluster assignment per face, in face id order. None is a noise face.
pub fn face_assignments(conn: &Connection) -> Result<Vec<(i64, Option<i64>)>> {
    let mut stmt =
        conn.prepare("SELECT id, unique_face_id FROM face_boxes ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn insert_face(db: &Database, embedding: &[f32]) -> i64 {
        db.conn
            .execute(
                r#"
                INSERT OR IGNORE INTO media (id, filename, relative_path, hash)
                VALUES ('m', 'a.jpg', 'a.jpg', 'h')
                "#,
                [],
            )
            .unwrap();
        db.conn
            .execute(
                r#"
                INSERT INTO frames (media_id, frame_percentage) VALUES ('m', 0)
                "#,
                [],
            )
            .unwrap();
        let frame_id = db.conn.last_insert_rowid();
        db.conn
            .execute(
                r#"
                INSERT INTO face_boxes (
                    frame_id, position_x, position_y, width, height, confidence,
                    age, sex,
                    mouth_left_x, mouth_left_y, mouth_right_x, mouth_right_y,
                    nose_tip_x, nose_tip_y,
                    eye_left_x, eye_left_y, eye_right_x, eye_right_y,
                    embedding
                ) VALUES (?1, 0.1, 0.1, 0.2, 0.2, 0.99, 30, 'F',
                          0, 0, 0, 0, 0, 0, 0, 0, 0, 0, ?2)
                "#,
                params![frame_id, embedding_to_bytes(embedding)],
            )
            .unwrap();
        db.conn.last_insert_rowid()
    }

    #[test]
    fn test_labeled_snapshot_and_attach() {
        let db = Database::open_in_memory().unwrap();
        let face_id = insert_face(&db, &[1.0, 0.0]);

        let alice = insert_unique_face(&db.conn, Some("Alice"), &[1.0, 0.0]).unwrap();
        insert_unique_face(&db.conn, None, &[0.0, 1.0]).unwrap();
        attach_faces(&db.conn, alice, &[face_id]).unwrap();

        let labeled = labeled_unique_faces(&db.conn).unwrap();
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].label, "Alice");

        let assignments = face_assignments(&db.conn).unwrap();
        assert_eq!(assignments[0].1, Some(alice));

        clear_face_links(&db.conn).unwrap();
        delete_unique_faces(&db.conn).unwrap();
        assert!(unique_faces(&db.conn).unwrap().is_empty());
        assert_eq!(face_assignments(&db.conn).unwrap()[0].1, None);
    }

    #[test]
    fn test_corrupt_embedding_surfaces_as_error() {
        // a row that fails to decode must fail the load, not silently
        // shrink the clustering corpus
        let db = Database::open_in_memory().unwrap();
        let face_id = insert_face(&db, &[1.0, 0.0]);
        db.conn
            .execute(
                "UPDATE face_boxes SET embedding = 42 WHERE id = ?",
                [face_id],
            )
            .unwrap();

        assert!(face_embeddings_ordered(&db.conn).is_err());
    }

    #[test]
    fn test_embeddings_load_in_id_order() {
        let db = Database::open_in_memory().unwrap();
        insert_face(&db, &[0.0, 1.0]);
        insert_face(&db, &[1.0, 0.0]);

        let loaded = face_embeddings_ordered(&db.conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].0 < loaded[1].0);
        assert_eq!(loaded[0].1, vec![0.0, 1.0]);
    }
}
