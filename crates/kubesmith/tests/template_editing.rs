use kubesmith::{
    PropertyEditor, PropertyType, StaticCatalog, Template, TemplateResource, resource_from_text,
    resource_to_text, validate_template,
};
use serde_json::json;

#[test]
fn editor_commits_flow_into_the_aggregate_and_survive_generation() {
    let mut template = Template::new("api-tier");
    let mut deployment = TemplateResource::new("Deployment", "apps/v1");
    deployment.name = "api".into();

    // Build the replicas field through an edit session.
    let mut editor = PropertyEditor::new(PropertyType::Integer);
    editor.set_title("Replicas");
    editor.set_default(json!(2));
    let committed = editor.commit();
    deployment.apply_property("replicas", true, &committed);

    // And a service-type enum field.
    let mut editor = PropertyEditor::new(PropertyType::String);
    editor.add_enum_value("ClusterIP");
    editor.add_enum_value("NodePort");
    editor.set_default(json!("ClusterIP"));
    let committed = editor.commit();
    deployment.apply_property("serviceType", false, &committed);

    assert!(template.add_resource(deployment));

    let catalog = StaticCatalog::builtin().unwrap();
    let report = validate_template(&template, &catalog).unwrap();
    assert!(report.valid, "unexpected errors: {:?}", report.errors);

    let text = resource_to_text(&template.resources[0]).unwrap();
    assert!(text.contains("replicas: 2"));
    assert!(text.contains("serviceType: ClusterIP"));
}

#[test]
fn text_edits_fold_back_destructively() {
    let mut template = Template::new("api-tier");
    let mut deployment = TemplateResource::new("Deployment", "apps/v1");
    deployment.name = "api".into();

    let mut editor = PropertyEditor::new(PropertyType::Integer);
    editor.set_default(json!(2));
    deployment.apply_property("replicas", true, &editor.commit());
    template.add_resource(deployment);

    // The operator rewrites the document, adding a field and changing the
    // replica count.
    let edited = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  replicas: 6
  paused: false
";
    let patch = resource_from_text(edited).unwrap();
    let id = template.resources[0].id.clone();
    let resource = template.resource_mut(&id).unwrap();
    patch.apply_to(resource);

    assert_eq!(resource.selected_fields.len(), 2);
    let replicas = resource.field("replicas").unwrap();
    assert_eq!(replicas.default, Some(json!(6)));
    // Destructive sync: the required flag set through the editor is gone.
    assert!(!replicas.required);
    let paused = resource.field("paused").unwrap();
    assert_eq!(paused.field_type, PropertyType::Boolean);
}

#[test]
fn enum_constraints_do_not_survive_a_text_round_trip() {
    let mut resource = TemplateResource::new("Service", "v1");
    resource.name = "svc".into();

    let mut editor = PropertyEditor::new(PropertyType::String);
    editor.add_enum_value("ClusterIP");
    editor.set_default(json!("ClusterIP"));
    resource.apply_property("type", false, &editor.commit());
    assert_eq!(resource.field("type").unwrap().allowed, ["ClusterIP"]);

    let text = resource_to_text(&resource).unwrap();
    let patch = resource_from_text(&text).unwrap();
    patch.apply_to(&mut resource);

    // The text form cannot carry the constraint; the documented destructive
    // contract drops it.
    assert!(resource.field("type").unwrap().allowed.is_empty());
}
