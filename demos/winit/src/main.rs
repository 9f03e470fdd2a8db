// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

#[cfg(not(target_os = "windows"))]
fn main() {
    eprintln!("This demo only runs on Windows");
}

#[cfg(target_os = "windows")]
fn main() {
    use desktop_drop::{DropEvent, DropTarget, Options, Win32Platform};
    use std::{collections::HashMap, rc::Rc};

    use winit::{
        application::ApplicationHandler,
        dpi::LogicalSize,
        event::WindowEvent,
        event_loop::{ActiveEventLoop, EventLoop},
        window::{Window, WindowId},
    };

    desktop_drop::set_logging_enabled(true);

    let event_loop = EventLoop::new().unwrap();

    struct Application {
        // drop support goes away with the entry, before the window is destroyed
        windows: HashMap<WindowId, (Rc<DropTarget<Win32Platform>>, Window)>,
    }

    impl ApplicationHandler for Application {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            let window = event_loop
                .create_window(
                    Window::default_attributes()
                        .with_inner_size(LogicalSize::new(400., 300.))
                        .with_title("Drop files here"),
                )
                .unwrap();

            let drop_support = desktop_drop::attach(
                &window,
                |event: DropEvent| match event {
                    DropEvent::Entered { x, y } => println!("--> entered at ({x}, {y})"),
                    DropEvent::Updated { x, y } => println!("--> over ({x}, {y})"),
                    DropEvent::Exited => println!("--> exited"),
                    DropEvent::Performed { paths } => println!("--> dropped {paths:?}"),
                },
                Options::default(),
            )
            .unwrap();

            if !drop_support.is_available() {
                eprintln!("drop support is unavailable for this window");
            }

            self.windows.insert(window.id(), (drop_support, window));
        }

        fn window_event(
            &mut self,
            event_loop: &ActiveEventLoop,
            window_id: WindowId,
            event: WindowEvent,
        ) {
            if let WindowEvent::CloseRequested = event {
                self.windows.remove(&window_id);
                if self.windows.is_empty() {
                    event_loop.exit()
                }
            }
        }
    }

    let mut app = Application {
        windows: Default::default(),
    };
    event_loop.run_app(&mut app).unwrap();
}
