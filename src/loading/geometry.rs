//! OBJ geometry loader

use std::{collections::HashSet, io::BufReader, rc::Rc};

use crate::{
    error::ResourceError,
    gfx::scene::{MeshData, MeshNode, ModelRoot},
};

use super::{
    resource::{CompletionSender, LoadEvent, ResourceKind},
    source::AssetSource,
};

/// Parses OBJ bytes into a model root with one mesh node per OBJ object/group.
///
/// Material libraries are not fetched. A referenced library resolves to the `usemtl` names in
/// first-use order, so each node keeps the index of the material the file assigned to it.
pub fn decode_obj(uri: &str, bytes: &[u8]) -> Result<ModelRoot, ResourceError> {
    let declared = usemtl_names(bytes);
    let mut reader = BufReader::new(bytes);
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| {
            let names = declared
                .iter()
                .enumerate()
                .map(|(index, name)| (name.clone(), index))
                .collect();
            Ok((Vec::new(), names))
        },
    )
    .map_err(|e| ResourceError::decode(uri, e))?;

    if models.iter().all(|m| m.mesh.positions.is_empty()) {
        return Err(ResourceError::decode(uri, "no geometry in file"));
    }

    let source_materials: HashSet<usize> =
        models.iter().filter_map(|m| m.mesh.material_id).collect();

    let nodes = models
        .into_iter()
        .filter(|m| !m.mesh.positions.is_empty())
        .map(|m| {
            let mesh = m.mesh;
            let indices = if mesh.indices.is_empty() {
                None
            } else {
                Some(mesh.indices)
            };
            let data = MeshData::new(mesh.positions, mesh.normals, mesh.texcoords, indices);
            MeshNode::new(&m.name, data, mesh.material_id)
        })
        .collect::<Vec<_>>();

    let name = nodes
        .first()
        .map(|node| node.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| uri.to_string());

    Ok(ModelRoot::new(&name, nodes, source_materials.len()))
}

/// Distinct `usemtl` names in order of first use
fn usemtl_names(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut names: Vec<String> = Vec::new();
    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix("usemtl") else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let name = rest.trim();
        if !name.is_empty() && !names.iter().any(|known| known == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Fetches and decodes the geometry asset, forwarding byte progress on the way
pub async fn load_geometry(source: Rc<dyn AssetSource>, uri: String, events: CompletionSender) {
    let progress_events = events.clone();
    let progress = Box::new(move |loaded, total| {
        progress_events.send(LoadEvent::Progress {
            kind: ResourceKind::Geometry,
            loaded,
            total,
        })
    });

    let event = match source
        .fetch(&uri, progress)
        .await
        .and_then(|bytes| decode_obj(&uri, &bytes))
    {
        Ok(model) => LoadEvent::GeometryLoaded(model),
        Err(error) => LoadEvent::Failed {
            kind: ResourceKind::Geometry,
            error,
        },
    };
    events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::MaterialSlot;

    const QUAD: &str = "\
o Quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn test_quad_is_triangulated() {
        let model = decode_obj("quad.obj", QUAD.as_bytes()).unwrap();
        assert_eq!(model.name, "Quad");
        assert_eq!(model.nodes.len(), 1);

        let mesh = &model.nodes[0].mesh;
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        // normals generated since the file has none
        assert_eq!(mesh.normals.len(), mesh.positions.len());
    }

    #[test]
    fn test_usemtl_assigns_source_material_ids() {
        let obj = "\
mtllib cat.mtl
o Body
v 0 0 0
v 1 0 0
v 0 1 0
usemtl fur
f 1 2 3
o Eyes
v 0 0 1
v 1 0 1
v 0 1 1
usemtl glass
f 4 5 6
";
        let model = decode_obj("cat.obj", obj.as_bytes()).unwrap();
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.source_material_count, 2);
        let slots: Vec<_> = model.nodes.iter().map(|node| node.material).collect();
        assert_eq!(
            slots,
            vec![MaterialSlot::Source(Some(0)), MaterialSlot::Source(Some(1))]
        );
    }

    #[test]
    fn test_usemtl_names_are_distinct_in_first_use_order() {
        let obj = b"usemtl glass\nf 1 2 3\nusemtl fur\n  usemtl glass\nusemtlx bad\nusemtl\n";
        assert_eq!(usemtl_names(obj), vec!["glass".to_string(), "fur".to_string()]);
    }

    #[test]
    fn test_empty_file_is_decode_error() {
        let result = decode_obj("empty.obj", b"# nothing here\n");
        assert!(matches!(result, Err(ResourceError::Decode { .. })));
    }
}
