use dartidl_compiler::idl::{Argument, Attribute, Constructor, IdlType, Interface, Operation, ParentRef};
use dartidl_compiler::{Database, Generator, GeneratorConfig, OutputSink, SystemKind};

fn canvas_database() -> Database {
    let mut db = Database::new();
    db.add_interface(Interface::new("Image")).unwrap();
    db.add_interface(Interface::new("Video")).unwrap();

    let draw = |source: &str, ty: &str| {
        Operation::new(
            "drawImage",
            IdlType::new("void"),
            vec![
                Argument::new(source, IdlType::new(ty)),
                Argument::new("x", IdlType::new("long")),
                Argument::new("y", IdlType::new("long")),
            ],
        )
    };

    let mut canvas = Interface::new("Canvas");
    canvas.operations = vec![draw("image", "Image"), draw("video", "Video")];
    canvas.attributes = vec![Attribute::getter("width", IdlType::new("long"))];
    canvas.constructors = vec![Constructor::default()];
    db.add_interface(canvas).unwrap();
    db
}

fn generate_native(db: Database) -> OutputSink {
    Generator::new(GeneratorConfig {
        systems: vec![SystemKind::Native],
        ..GeneratorConfig::default()
    })
    .generate_in_memory(db)
    .unwrap()
}

#[test]
fn overloads_dispatch_to_private_natives() {
    let sink = generate_native(canvas_database());
    let dart = sink.get("native/_CanvasImpl.dart").unwrap();

    assert!(dart.contains("class _CanvasImpl extends NativeFieldWrapperClass1 implements Canvas {"));
    assert!(dart.contains(
        "    if (image_OR_video is Image) {\n      \
         _drawImage_1(image_OR_video, x, y);\n    \
         } else {\n      \
         _drawImage_2(image_OR_video, x, y);\n    \
         }\n"
    ));
    assert!(dart.contains(
        "  void _drawImage_1(Image image_OR_video, int x, int y) native \"Canvas_drawImage_1_Callback\";\n"
    ));
    assert!(dart.contains(
        "  void _drawImage_2(Video image_OR_video, int x, int y) native \"Canvas_drawImage_2_Callback\";\n"
    ));
    assert!(dart.contains("  int get width native \"Canvas_width_Getter\";\n"));
    assert!(dart.contains("class _CanvasFactoryProvider {"));
    assert!(dart.contains("static Canvas createCanvas() native \"Canvas_constructor_Callback\";"));
}

#[test]
fn resolver_agrees_with_dart_bindings() {
    let sink = generate_native(canvas_database());
    let cpp = sink.get("native/cpp/DartCanvas.cpp").unwrap();

    assert!(cpp.contains("Dart_NativeFunction CanvasResolver(Dart_Handle nameHandle, int argumentCount)"));
    assert!(cpp.contains(
        "    if (argumentCount == 4 && name == \"Canvas_drawImage_1_Callback\")\n        \
         return DartCanvasInternal::drawImage_1Callback;\n"
    ));
    assert!(cpp.contains(
        "    if (argumentCount == 1 && name == \"Canvas_width_Getter\")\n        \
         return DartCanvasInternal::widthGetter;\n"
    ));
    assert!(cpp.contains(
        "    if (argumentCount == 0 && name == \"Canvas_constructor_Callback\")\n        \
         return DartCanvasInternal::constructorCallback;\n"
    ));
    assert!(cpp.contains("        return DartCanvasInternal::drawImage_2Callback;\n    return 0;\n}\n"));
    assert!(cpp.contains("#include \"DartImage.h\""));
    assert!(cpp.contains("#include \"DartVideo.h\""));

    let header = sink.get("native/cpp/DartCanvas.h").unwrap();
    assert!(header.contains("    void drawImage_1Callback(Dart_NativeArguments);\n"));
    assert!(header.contains("Dart_NativeFunction CanvasResolver(Dart_Handle name, int argumentCount);"));
}

#[test]
fn aggregate_sources_cover_every_interface() {
    let sink = generate_native(canvas_database());

    let resolver = sink.get("native/cpp/DartResolver.cpp").unwrap();
    for id in ["Image", "Video", "Canvas"] {
        assert!(resolver.contains(&format!("#include \"Dart{}.h\"", id)));
        assert!(resolver.contains(&format!(
            "    if (Dart_NativeFunction func = {}Resolver(name, argumentCount))\n        return func;\n",
            id
        )));
    }
    assert!(resolver.ends_with("    return 0;\n}\n\n}\n"));

    let derived = sink.get("native/cpp/DartDerivedSourcesAll.cpp").unwrap();
    assert!(derived.contains("#include \"DartCanvas.cpp\"\n"));

    let manifest = sink.get("native/html_native.dart").unwrap();
    assert!(manifest.contains("import 'dart:nativewrappers';"));
    assert!(manifest.contains("part '_CanvasImpl.dart';"));
    assert!(!manifest.contains(".cpp"));
}

#[test]
fn raising_operations_convert_exception_codes() {
    let mut db = Database::new();
    let mut node = Interface::new("Node");
    let mut append = Operation::new(
        "appendChild",
        IdlType::new("Node"),
        vec![Argument::new("child", IdlType::new("Node"))],
    );
    append.raises_exception = true;
    node.operations = vec![append];
    db.add_interface(node).unwrap();

    let sink = generate_native(db);
    let cpp = sink.get("native/cpp/DartNode.cpp").unwrap();

    assert!(cpp.contains("void appendChildCallback(Dart_NativeArguments args)\n{"));
    assert!(cpp.contains("        ExceptionCode ec = 0;\n"));
    assert!(cpp.contains("receiver->appendChild(arg0.get(), ec)"));
    assert!(cpp.contains("exception = DartDOMWrapper::exceptionCodeToDartException(ec);"));
    assert!(cpp.contains("fail:\n    Dart_ThrowException(exception);"));
    assert!(cpp.contains("    if (argumentCount == 2 && name == \"Node_appendChild_Callback\")\n"));
}

#[test]
fn members_shared_by_secondary_parents_are_bound_once() {
    let void_op = |id: &str| Operation::new(id, IdlType::new("void"), vec![]);
    let label = || Attribute::getter("label", IdlType::new("DOMString"));

    let mut db = Database::new();
    let mut a = Interface::new("A");
    a.operations = vec![void_op("m")];
    let mut b = Interface::new("B");
    b.operations = vec![void_op("n")];
    b.attributes = vec![label()];
    let mut d = Interface::new("D");
    d.operations = vec![void_op("n")];
    d.attributes = vec![label()];
    let mut c = Interface::new("C");
    c.parents = ["A", "B", "D"].into_iter().map(ParentRef::new).collect();
    for i in [a, b, d, c] {
        db.add_interface(i).unwrap();
    }

    let sink = generate_native(db);

    let dart = sink.get("native/_CImpl.dart").unwrap();
    assert_eq!(dart.matches("void n() native \"C_n_Callback\";").count(), 1);
    assert_eq!(dart.matches("String get label native \"C_label_Getter\";").count(), 1);

    let cpp = sink.get("native/cpp/DartC.cpp").unwrap();
    assert_eq!(cpp.matches("void nCallback(Dart_NativeArguments args)").count(), 1);
    assert_eq!(cpp.matches("name == \"C_n_Callback\"").count(), 1);
    assert_eq!(cpp.matches("void labelGetter(Dart_NativeArguments args)").count(), 1);
}
